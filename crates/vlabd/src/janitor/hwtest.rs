// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hardware self-test runner (spec §4.5). Runs every `hwtest_interval` or
//! immediately when `hwtest.trigger` is set, under the global
//! `hwtest.running` advisory lease so at most one run is in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use vlabstore::{keys, lease::now_epoch};

use crate::state::VlabdState;

const POLL_INTERVAL: Duration = Duration::from_secs(30);

pub fn spawn(state: Arc<VlabdState>) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(POLL_INTERVAL);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_run = Instant::now();

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => return,
                _ = timer.tick() => {}
            }

            let triggered = match state.store.get(keys::HWTEST_TRIGGER).await {
                Ok(v) => v.is_some(),
                Err(e) => {
                    tracing::warn!(err = %e, "hwtest: could not read trigger flag, skipping tick");
                    continue;
                }
            };
            let due = last_run.elapsed() >= state.config.hwtest_interval();
            if !triggered && !due {
                continue;
            }

            if !try_acquire_run_lease(&state).await {
                tracing::debug!("hwtest: run already in flight, skipping tick");
                continue;
            }

            last_run = Instant::now();
            let _ = state.store.del(keys::HWTEST_TRIGGER).await;
            run_once(&state).await;
            let _ = state.store.del(keys::HWTEST_RUNNING).await;
        }
    });
}

async fn try_acquire_run_lease(state: &VlabdState) -> bool {
    match state.store.get(keys::HWTEST_RUNNING).await {
        Ok(Some(_)) => false,
        Ok(None) => state.store.setex(keys::HWTEST_RUNNING, "1", state.config.hwtest_run_ttl()).await.is_ok(),
        Err(e) => {
            tracing::warn!(err = %e, "hwtest: could not check run lease");
            false
        }
    }
}

async fn run_once(state: &VlabdState) {
    let classes = match state.store.smembers(keys::BOARDCLASSES).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(err = %e, "hwtest: could not list board classes, aborting run");
            return;
        }
    };

    for class in classes {
        let serials = match state.store.smembers(&keys::class_boards(&class)).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(class, err = %e, "hwtest: could not list boards, skipping class");
                continue;
            }
        };
        for serial in serials {
            if let Err(e) = test_board(state, &class, &serial).await {
                tracing::warn!(class, serial, err = %e, "hwtest: failed to test board");
            }
        }
    }
}

async fn test_board(state: &VlabdState, class: &str, serial: &str) -> Result<(), vlabstore::VlabError> {
    let lock = state.lease.read_lock(serial).await?;
    let session = state.lease.read_session(serial).await?;
    if lock.is_some() || session.is_some() {
        return Ok(());
    }

    state.store.zrem(&keys::class_available(class), serial).await?;
    state.store.zrem(&keys::class_unlocked(class), serial).await?;
    state
        .store
        .setex(&keys::board_hwtest_testing(serial), "1", state.config.hwtest_testing_ttl())
        .await?;

    let outcome = state.hwtest_runner.run_self_test(serial, state.config.ssh_timeout()).await;
    let (status, message) = match &outcome {
        Ok(output) if output.contains(state.config.hwtest_magic_string.as_str()) => {
            ("pass", "self-test passed".to_owned())
        }
        Ok(output) => ("fail", format!("magic string not found in output: {output:.200}")),
        Err(e) => ("fail", e.to_string()),
    };

    state.store.set(&keys::board_hwtest_status(serial), status).await?;
    state.store.set(&keys::board_hwtest_time(serial), &now_epoch().to_string()).await?;
    state.store.set(&keys::board_hwtest_message(serial), &message).await?;
    state.store.del(&keys::board_hwtest_testing(serial)).await?;

    if status == "pass" {
        state.store.zadd(&keys::class_available(class), serial, now_epoch() as f64).await?;
        state.store.zadd(&keys::class_unlocked(class), serial, now_epoch() as f64).await?;
    } else {
        tracing::warn!(class, serial, message, "hwtest: board failed self-test");
    }

    state.reset_command.reset(serial).await?;
    Ok(())
}

#[cfg(test)]
#[path = "hwtest_tests.rs"]
mod tests;
