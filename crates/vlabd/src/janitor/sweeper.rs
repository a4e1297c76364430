// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock/session timeout sweeper (spec §4.5). Reconciles orphaned boards,
//! dead sessions, half-locked boards (crash between `lockBoard` and
//! `startSession`), and expired leases, once per [`VlabdConfig::sweep_interval`].

use std::sync::Arc;

use vlabstore::{keys, lease::now_epoch};

use crate::state::VlabdState;

pub fn spawn(state: Arc<VlabdState>) {
    let interval = state.config.sweep_interval();
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => return,
                _ = timer.tick() => {}
            }
            sweep_once(&state).await;
        }
    });
}

async fn sweep_once(state: &VlabdState) {
    let classes = match state.store.smembers(keys::BOARDCLASSES).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(err = %e, "sweeper: could not list board classes, skipping tick");
            return;
        }
    };

    for class in classes {
        match state.store.get(&keys::class_locking(&class)).await {
            Ok(Some(_)) => {
                tracing::debug!(class, "sweeper: skipping class, allocation in flight");
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(class, err = %e, "sweeper: could not check locking token, skipping class");
                continue;
            }
        }

        let serials = match state.store.smembers(&keys::class_boards(&class)).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(class, err = %e, "sweeper: could not list boards, skipping class");
                continue;
            }
        };

        for serial in serials {
            if let Err(e) = sweep_board(state, &class, &serial).await {
                tracing::warn!(class, serial, err = %e, "sweeper: failed to reconcile board");
            }
        }
    }
}

async fn sweep_board(state: &VlabdState, class: &str, serial: &str) -> Result<(), vlabstore::VlabError> {
    let lock = state.lease.read_lock(serial).await?;
    let session = state.lease.read_session(serial).await?;
    let in_available = state.store.sismember(&keys::class_available(class), serial).await?;
    let in_unlocked = state.store.zscore(&keys::class_unlocked(class), serial).await?.is_some();

    if !in_available && session.is_none() && lock.is_none() {
        tracing::warn!(class, serial, "sweeper: orphaned board, recovering");
        recover(state, serial).await?;
        state.store.zadd(&keys::class_unlocked(class), serial, now_epoch() as f64).await?;
        state.store.zadd(&keys::class_available(class), serial, now_epoch() as f64).await?;
        return Ok(());
    }

    if let Some(session) = &session {
        if now_epoch().saturating_sub(session.ping) > state.config.ping_timeout_secs {
            tracing::warn!(class, serial, user = %session.user, "sweeper: dead session, recovering");
            recover(state, serial).await?;
            state.lease.unlock_board(serial, class).await?;
            state.lease.end_session(serial, class).await?;
            return Ok(());
        }
    }

    if let Some(lock) = &lock {
        if session.is_none() && !in_unlocked {
            tracing::warn!(class, serial, user = %lock.user, "sweeper: half-locked board, recovering");
            recover(state, serial).await?;
            state.lease.unlock_board(serial, class).await?;
            return Ok(());
        }

        if now_epoch().saturating_sub(lock.time) > state.config.max_lock_time_secs {
            tracing::info!(class, serial, user = %lock.user, "sweeper: lease expired, force-unlocking");
            state.lease.unlock_board(serial, class).await?;
        }
    }

    Ok(())
}

async fn recover(state: &VlabdState, serial: &str) -> Result<(), vlabstore::VlabError> {
    state.reset_command.reset(serial).await?;
    state.host_agent.restart(serial).await?;
    Ok(())
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
