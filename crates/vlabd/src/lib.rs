// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vlabd`: the control-plane daemon running C5's janitors and C6's
//! observability API against the shared control store.

pub mod config;
pub mod error;
pub mod janitor;
pub mod observability;
pub mod state;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use vlabstore::{RedisConfig, RedisStore, Store};

use crate::config::VlabdConfig;
use crate::state::VlabdState;

/// Run the daemon until shutdown: connect to the control store, spawn every
/// janitor, and serve the observability API until the process is signalled
/// to stop.
pub async fn run(config: VlabdConfig) -> anyhow::Result<()> {
    config.validate()?;

    let redis_config = RedisConfig {
        url: config.redis_url.clone(),
        connect_attempts: config.redis_connect_attempts,
        connect_interval: config.redis_connect_interval(),
    };
    let store: Arc<dyn Store> = Arc::new(RedisStore::connect(&redis_config).await?);

    let shutdown = CancellationToken::new();
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(VlabdState::new(store, config, shutdown.clone()));

    janitor::spawn_all(Arc::clone(&state));

    let router = transport::build_router(Arc::clone(&state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr, "vlabd listening");

    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown(shutdown)).await?;
    Ok(())
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    shutdown.cancelled().await;
    // Give in-flight janitor ticks a moment to observe cancellation before
    // the process exits.
    tokio::time::sleep(Duration::from_millis(50)).await;
}
