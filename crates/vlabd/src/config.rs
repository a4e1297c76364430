// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the `vlabd` control-plane daemon (C5 janitors + C6 API).
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "vlabd", version, about)]
pub struct VlabdConfig {
    /// Host to bind the observability API on.
    #[arg(long, default_value = "127.0.0.1", env = "VLAB_API_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "VLAB_API_PORT")]
    pub port: u16,

    /// Bearer token for the observability API. If unset, auth is disabled.
    #[arg(long, env = "VLAB_API_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Control store connection URL.
    #[arg(long, default_value = "redis://127.0.0.1:6379", env = "VLAB_REDIS_URL")]
    pub redis_url: String,

    /// Control store connection attempts at startup before giving up.
    #[arg(long, default_value_t = 5, env = "VLAB_REDIS_CONNECT_ATTEMPTS")]
    pub redis_connect_attempts: u32,

    /// Delay between control store connection attempts, in milliseconds.
    #[arg(long, default_value_t = 2000, env = "VLAB_REDIS_CONNECT_INTERVAL_MS")]
    pub redis_connect_interval_ms: u64,

    /// Path to the configuration document (users + known boards).
    #[arg(long, env = "VLAB_CONFIG_PATH")]
    pub config_path: PathBuf,

    /// Path to the append-only access log.
    #[arg(long, env = "VLAB_ACCESS_LOG_PATH")]
    pub access_log_path: PathBuf,

    /// Class-lease expiry, in seconds (spec §5 `MAX_LOCK_TIME`).
    #[arg(long, default_value_t = 600, env = "VLAB_MAX_LOCK_TIME_SECS")]
    pub max_lock_time_secs: u64,

    /// Dead-session timeout, in seconds (spec §5 `PING_TIMEOUT`).
    #[arg(long, default_value_t = 30, env = "VLAB_PING_TIMEOUT_SECS")]
    pub ping_timeout_secs: u64,

    /// `locking[C]` coarse-serialization TTL, in seconds (spec §5 `LOCKING_TTL`).
    #[arg(long, default_value_t = 2, env = "VLAB_LOCKING_TTL_SECS")]
    pub locking_ttl_secs: u64,

    /// Lock/session sweeper cadence, in seconds.
    #[arg(long, default_value_t = 60, env = "VLAB_SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: u64,

    /// Enable the reachability prober janitor (spec §4.5, "flag-gated").
    #[arg(long, default_value_t = false, env = "VLAB_ENABLE_PROBER")]
    pub enable_prober: bool,

    /// Hardware self-test cadence, in seconds (spec §5 default 4h).
    #[arg(long, default_value_t = 14_400, env = "VLAB_HWTEST_INTERVAL_SECS")]
    pub hwtest_interval_secs: u64,

    /// Hardware self-test global run lease TTL, in seconds (spec §5 `HWTEST_RUN_TTL`).
    #[arg(long, default_value_t = 14_400, env = "VLAB_HWTEST_RUN_TTL_SECS")]
    pub hwtest_run_ttl_secs: u64,

    /// Per-board `testing` marker TTL, in seconds (spec §5 `HWTEST_TESTING_TTL`).
    #[arg(long, default_value_t = 120, env = "VLAB_HWTEST_TESTING_TTL_SECS")]
    pub hwtest_testing_ttl_secs: u64,

    /// Bounded window for the hardware self-test's serial capture, in seconds
    /// (spec §5 `SSH_TIMEOUT`).
    #[arg(long, default_value_t = 30, env = "VLAB_SSH_TIMEOUT_SECS")]
    pub ssh_timeout_secs: u64,

    /// Magic string the self-test bitstream's serial output must contain to
    /// count as a pass.
    #[arg(long, default_value = "VLAB_HWTEST_OK", env = "VLAB_HWTEST_MAGIC_STRING")]
    pub hwtest_magic_string: String,

    /// Path to the `vlab` binary, shelled out to by the janitors for
    /// container restarts and board resets (spec §1 "consumed as a capability").
    #[arg(long, default_value = "vlab", env = "VLAB_BINARY_PATH")]
    pub vlab_binary_path: PathBuf,

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

impl VlabdConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("--port must be nonzero");
        }
        if self.max_lock_time_secs == 0 {
            anyhow::bail!("--max-lock-time-secs must be nonzero");
        }
        Ok(())
    }

    pub fn redis_connect_interval(&self) -> Duration {
        Duration::from_millis(self.redis_connect_interval_ms)
    }

    pub fn max_lock_time(&self) -> Duration {
        Duration::from_secs(self.max_lock_time_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn locking_ttl(&self) -> Duration {
        Duration::from_secs(self.locking_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn hwtest_interval(&self) -> Duration {
        Duration::from_secs(self.hwtest_interval_secs)
    }

    pub fn hwtest_run_ttl(&self) -> Duration {
        Duration::from_secs(self.hwtest_run_ttl_secs)
    }

    pub fn hwtest_testing_ttl(&self) -> Duration {
        Duration::from_secs(self.hwtest_testing_ttl_secs)
    }

    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
