// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config reload janitor (spec §4.5): when `config.reload` appears,
//! re-parse the configuration document and diff it against `users` and the
//! known-board registry. Adds are applied immediately; removals clean ACL
//! and metadata but never touch `portcounter`, which is `setnx`-seeded only.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use vlabstore::config_doc::{self, ConfigDocument};
use vlabstore::{keys, VlabError};

use crate::state::VlabdState;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub fn spawn(state: Arc<VlabdState>) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(POLL_INTERVAL);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => return,
                _ = timer.tick() => {}
            }

            match state.store.get(keys::CONFIG_RELOAD).await {
                Ok(Some(_)) => {
                    let _ = state.store.del(keys::CONFIG_RELOAD).await;
                    reload_once(&state).await;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(err = %e, "reload: could not check reload flag"),
            }
        }
    });
}

async fn reload_once(state: &VlabdState) {
    let text = match tokio::fs::read_to_string(&state.config.config_path).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(
                path = %state.config.config_path.display(),
                err = %e,
                "config reload rejected: could not read configuration document"
            );
            return;
        }
    };

    let doc = match config_doc::parse(&text) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(err = %e, "config reload rejected: invalid configuration document");
            return;
        }
    };

    if let Err(e) = apply(state, &doc).await {
        tracing::error!(err = %e, "config reload failed midway; control store may be partially updated");
        return;
    }

    tracing::info!(users = doc.users.len(), boards = doc.boards.len(), "config reload applied");
}

async fn apply(state: &VlabdState, doc: &ConfigDocument) -> Result<(), VlabError> {
    reconcile_users(state, doc).await?;
    reconcile_boards(state, doc).await?;
    Ok(())
}

async fn reconcile_users(state: &VlabdState, doc: &ConfigDocument) -> Result<(), VlabError> {
    let current: HashSet<String> = state.store.smembers(keys::USERS).await?.into_iter().collect();
    let desired: HashSet<&str> = doc.users.iter().map(|u| u.name.as_str()).collect();

    for name in current.iter().filter(|n| !desired.contains(n.as_str())) {
        tracing::info!(user = name, "config reload: removing stale user");
        state.store.srem(keys::USERS, name).await?;
        state.store.del(&keys::user_overlord(name)).await?;
        state.store.del(&keys::user_allowedclasses(name)).await?;
    }

    for user in &doc.users {
        state.store.sadd(keys::USERS, &user.name).await?;
        if user.overlord {
            state.store.set(&keys::user_overlord(user.name.as_str()), "1").await?;
        } else {
            state.store.del(&keys::user_overlord(user.name.as_str())).await?;
        }
        state
            .store
            .set(&keys::user_allowedclasses(user.name.as_str()), &user.allowed_classes.join(","))
            .await?;
    }

    Ok(())
}

async fn reconcile_boards(state: &VlabdState, doc: &ConfigDocument) -> Result<(), VlabError> {
    let current: HashSet<String> = state.store.smembers(keys::KNOWNBOARDS).await?.into_iter().collect();
    let desired: HashSet<&str> = doc.boards.iter().map(|b| b.serial.as_str()).collect();

    for serial in current.iter().filter(|s| !desired.contains(s.as_str())) {
        tracing::info!(serial, "config reload: dropping known-board metadata for removed board");
        state.store.srem(keys::KNOWNBOARDS, serial).await?;
        if let Some(class) = state.store.get(&keys::board_class(serial)).await? {
            state.store.srem(&keys::class_boards(&class), serial).await?;
        }
        state.store.del(&keys::board_class(serial)).await?;
        state.store.del(&keys::board_type(serial)).await?;
        state.store.del(&keys::board_reset(serial)).await?;
    }

    for board in &doc.boards {
        if let Some(old_class) = state.store.get(&keys::board_class(board.serial.as_str())).await? {
            if old_class != board.class {
                state.store.srem(&keys::class_boards(&old_class), board.serial.as_str()).await?;
            }
        }
        state.store.sadd(keys::BOARDCLASSES, &board.class).await?;
        state.store.sadd(&keys::class_boards(&board.class), &board.serial).await?;
        state.store.sadd(keys::KNOWNBOARDS, &board.serial).await?;
        state.store.set(&keys::board_class(board.serial.as_str()), &board.class).await?;
        state.store.set(&keys::board_type(board.serial.as_str()), &board.r#type).await?;
        state
            .store
            .set(&keys::board_reset(board.serial.as_str()), if board.reset { "true" } else { "false" })
            .await?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "reload_tests.rs"]
mod tests;
