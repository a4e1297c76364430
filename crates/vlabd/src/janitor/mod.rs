// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic reconcilers (C5, spec §4.5): one Tokio task per janitor, each
//! selecting over its own ticker and the shared shutdown token, the way the
//! teacher's `spawn_health_checker` runs alongside the rest of `MuxState`.

pub mod hwtest;
pub mod prober;
pub mod reload;
pub mod sweeper;

use std::sync::Arc;

use crate::state::VlabdState;

/// Spawn every janitor against the shared daemon state.
pub fn spawn_all(state: Arc<VlabdState>) {
    sweeper::spawn(Arc::clone(&state));
    prober::spawn(Arc::clone(&state));
    hwtest::spawn(Arc::clone(&state));
    reload::spawn(state);
}
