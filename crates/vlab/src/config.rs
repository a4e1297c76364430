// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-store connection arguments shared by every subcommand, flattened
//! into each subcommand's own `clap::Args` struct the way the teacher
//! flattens its top-level `Config` into `Cli` (`crates/cli/src/main.rs`).

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use vlabstore::{Lease, RedisConfig, RedisStore, Store};

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Control store connection URL.
    #[arg(long, default_value = "redis://127.0.0.1:6379", env = "VLAB_REDIS_URL")]
    pub redis_url: String,

    /// Control store connection attempts at startup before giving up.
    #[arg(long, default_value_t = 5, env = "VLAB_REDIS_CONNECT_ATTEMPTS")]
    pub redis_connect_attempts: u32,

    /// Delay between control store connection attempts, in milliseconds.
    #[arg(long, default_value_t = 2000, env = "VLAB_REDIS_CONNECT_INTERVAL_MS")]
    pub redis_connect_interval_ms: u64,
}

impl StoreArgs {
    pub async fn connect(&self) -> anyhow::Result<Lease> {
        let config = RedisConfig {
            url: self.redis_url.clone(),
            connect_attempts: self.redis_connect_attempts,
            connect_interval: Duration::from_millis(self.redis_connect_interval_ms),
        };
        let store: Arc<dyn Store> = Arc::new(RedisStore::connect(&config).await?);
        Ok(Lease::new(store))
    }
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "VLAB_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Log level filter, overridden by `RUST_LOG` if set.
    #[arg(long, default_value = "info", env = "VLAB_LOG_LEVEL")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogArgs {
    pub fn init(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(self.log_level.clone()));
        match self.log_format {
            LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
            LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        }
    }
}

/// Resolves the acting user: `--user` wins for testing and for transports
/// that can't set the process UID; otherwise the OS user the forced SSH
/// command is running as (spec §6, "the user's identity from the
/// transport").
pub fn resolve_user(explicit: Option<String>) -> anyhow::Result<String> {
    if let Some(user) = explicit {
        return Ok(user);
    }
    let uid = nix::unistd::getuid();
    let user = nix::unistd::User::from_uid(uid)
        .map_err(|e| anyhow::anyhow!("looking up user for uid {uid}: {e}"))?
        .ok_or_else(|| anyhow::anyhow!("no passwd entry for uid {uid}"))?;
    Ok(user.name)
}
