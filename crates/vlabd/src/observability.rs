// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-model for the observability API (C6): per-board status projection
//! and per-class summary counts, computed straight from the control store
//! (spec §4.6).

use std::collections::HashMap;

use serde::Serialize;
use vlabstore::types::{project_status, BoardStatus, ClassSummary};
use vlabstore::{keys, VlabError};

use crate::state::VlabdState;

#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub serial: String,
    pub class: String,
    pub r#type: String,
    #[serde(flatten)]
    pub status: BoardStatus,
}

/// Compute the current [`BoardView`] for every known board.
pub async fn board_views(state: &VlabdState) -> Result<Vec<BoardView>, VlabError> {
    let mut views = Vec::new();
    let classes = state.store.smembers(keys::BOARDCLASSES).await?;
    for class in classes {
        let serials = state.store.smembers(&keys::class_boards(&class)).await?;
        for serial in serials {
            let r#type = state.store.get(&keys::board_type(&serial)).await?.unwrap_or_default();
            let in_available = state.store.sismember(&keys::class_available(&class), &serial).await?;
            let in_unlocked = state.store.zscore(&keys::class_unlocked(&class), &serial).await?.is_some();
            let lock = state.lease.read_lock(&serial).await?;
            let session = state.lease.read_session(&serial).await?;
            let hwtest_failed =
                state.store.get(&keys::board_hwtest_status(&serial)).await?.as_deref() == Some("fail");

            let status = project_status(in_available, in_unlocked, lock.as_ref(), session.as_ref(), hwtest_failed);
            views.push(BoardView { serial, class: class.clone(), r#type, status });
        }
    }
    Ok(views)
}

/// Aggregate [`BoardView`]s into per-class summary counts (spec §4.6:
/// `in_use_unlocked = min(unlocked-card, in_use)` to avoid double-counting
/// the transient overlap between the unlocked pool and a live session).
pub fn summarize(views: &[BoardView]) -> Vec<ClassSummary> {
    let mut by_class: HashMap<&str, ClassSummary> = HashMap::new();
    for view in views {
        let summary = by_class.entry(view.class.as_str()).or_insert_with(|| ClassSummary {
            class: view.class.clone(),
            ..ClassSummary::default()
        });
        summary.total += 1;
        match &view.status {
            BoardStatus::Available => summary.available += 1,
            BoardStatus::InUseLocked { .. } => {
                summary.in_use += 1;
                summary.in_use_locked += 1;
            }
            BoardStatus::InUseUnlocked { .. } => {
                summary.in_use += 1;
                summary.in_use_unlocked += 1;
            }
            BoardStatus::HwTestFailed => summary.hwtest_failed += 1,
            BoardStatus::Unknown => {}
        }
    }
    let mut summaries: Vec<ClassSummary> = by_class.into_values().collect();
    summaries.sort_by(|a, b| a.class.cmp(&b.class));
    summaries
}
