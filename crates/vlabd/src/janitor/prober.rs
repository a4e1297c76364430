// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reachability prober (spec §4.5), flag-gated by `enable_prober`. Probes
//! every attached board's `server:port`; a board that fails twice, 3s apart,
//! is removed entirely.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use vlabstore::keys;

use crate::state::VlabdState;

const RETRY_DELAY: Duration = Duration::from_secs(3);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn spawn(state: Arc<VlabdState>) {
    if !state.config.enable_prober {
        tracing::info!("prober: disabled");
        return;
    }

    let interval = state.config.sweep_interval();
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => return,
                _ = timer.tick() => {}
            }
            probe_once(&state).await;
        }
    });
}

async fn probe_once(state: &VlabdState) {
    let classes = match state.store.smembers(keys::BOARDCLASSES).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(err = %e, "prober: could not list board classes, skipping tick");
            return;
        }
    };

    for class in classes {
        let serials = match state.store.smembers(&keys::class_boards(&class)).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(class, err = %e, "prober: could not list boards, skipping class");
                continue;
            }
        };
        for serial in serials {
            if let Err(e) = probe_board(state, &serial).await {
                tracing::warn!(class, serial, err = %e, "prober: failed to probe board");
            }
        }
    }
}

async fn probe_board(state: &VlabdState, serial: &str) -> Result<(), vlabstore::VlabError> {
    let server = state.store.get(&keys::board_server(serial)).await?;
    let port = state.store.get(&keys::board_port(serial)).await?;
    let (Some(server), Some(port)) = (server, port) else {
        return Ok(());
    };
    let addr = format!("{server}:{port}");

    if try_connect(&addr).await {
        return Ok(());
    }

    tracing::warn!(serial, addr, "prober: board unreachable, retrying once");
    tokio::time::sleep(RETRY_DELAY).await;

    if try_connect(&addr).await {
        return Ok(());
    }

    tracing::warn!(serial, addr, "prober: board unreachable twice, removing");
    state.lease.remove_board(serial).await
}

async fn try_connect(addr: &str) -> bool {
    matches!(tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

#[cfg(test)]
#[path = "prober_tests.rs"]
mod tests;
