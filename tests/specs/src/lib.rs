// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `vlabd` binary as a subprocess and exercises its
//! observability API over HTTP. Requires a reachable Redis instance
//! (`VLAB_SPEC_REDIS_URL`, defaulting to `redis://127.0.0.1:6379`); tests
//! skip rather than fail when one isn't available, since bringing up Redis
//! is outside what a smoke test should own.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Resolve the path to the compiled `vlabd` binary.
pub fn vlabd_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs -> tests -> workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("vlabd")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn redis_url() -> String {
    std::env::var("VLAB_SPEC_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_owned())
}

/// True if something is listening on the configured Redis URL's host:port.
/// Tests use this to skip gracefully in environments with no Redis.
pub fn redis_reachable() -> bool {
    use std::net::ToSocketAddrs;
    let url = redis_url();
    let Some(hostport) = url.strip_prefix("redis://") else { return false };
    let Ok(mut addrs) = hostport.to_socket_addrs() else { return false };
    let Some(addr) = addrs.next() else { return false };
    std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_ok()
}

/// A minimal, valid `#`-commented config document (spec §6): one overlord
/// user with access to the `zybo` class, and one known board.
pub const SAMPLE_CONFIG: &str = r#"
{
  "users": {
    "alice": { "overlord": true, "allowedboards": ["zybo"] }
  },
  "boards": {
    "B1": { "class": "zybo", "type": "zybo-z7", "reset": null }
  }
}
"#;

/// A running `vlabd` process that is killed on drop.
pub struct VlabdProcess {
    child: Child,
    port: u16,
    _config_dir: tempfile::TempDir,
}

impl VlabdProcess {
    /// Spawn `vlabd` with a fresh config document and access log under a
    /// temp dir, pointed at the configured Redis instance.
    pub fn start() -> anyhow::Result<Self> {
        let binary = vlabd_binary();
        anyhow::ensure!(binary.exists(), "vlabd binary not found at {}", binary.display());

        let config_dir = tempfile::tempdir()?;
        let config_path = config_dir.path().join("vlab.json");
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        let access_log_path = config_dir.path().join("access.log");

        let port = free_port()?;

        let child = Command::new(&binary)
            .args([
                "--host",
                "127.0.0.1",
                "--port",
                &port.to_string(),
                "--redis-url",
                &redis_url(),
                "--config-path",
                &config_path.to_string_lossy(),
                "--access-log-path",
                &access_log_path.to_string_lossy(),
                "--redis-connect-attempts",
                "3",
                "--log-format",
                "text",
                "--log-level",
                "warn",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, port, _config_dir: config_dir })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Poll `/api/v1/health` until it responds successfully.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let client = reqwest::Client::new();
        let url = format!("{}/api/v1/health", self.base_url());
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("vlabd did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for VlabdProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
