// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device symlink resolution (spec §1 "device detection and symlink
//! creation... the core only cares about its callbacks"). The single
//! attempt lives behind this capability; the retry-while-nodes-enumerate
//! loop is C3's own orchestration (spec §4.3 attach point 1) and lives in
//! `command::host_agent`.

use async_trait::async_trait;
use vlabstore::VlabError;

/// Resolved device nodes for one board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDevices {
    pub jtag: String,
    pub uart: String,
}

#[async_trait]
pub trait DeviceResolver: Send + Sync {
    /// A single resolution attempt. `None` means the nodes have not
    /// appeared (yet) under `/dev` — the caller retries.
    async fn resolve(&self, serial: &str) -> Result<Option<BoardDevices>, VlabError>;
}

/// Looks for `<base_dir>/<serial>/jtag` and `<base_dir>/<serial>/tty`, the
/// symlink layout a udev rule creates for a board's nodes (default
/// `base_dir` is `/dev/vlab`).
pub struct UdevDeviceResolver {
    pub base_dir: std::path::PathBuf,
}

#[async_trait]
impl DeviceResolver for UdevDeviceResolver {
    async fn resolve(&self, serial: &str) -> Result<Option<BoardDevices>, VlabError> {
        let jtag = self.base_dir.join(serial).join("jtag");
        let uart = self.base_dir.join(serial).join("tty");
        if tokio::fs::try_exists(&jtag).await.unwrap_or(false) && tokio::fs::try_exists(&uart).await.unwrap_or(false) {
            Ok(Some(BoardDevices { jtag: jtag.display().to_string(), uart: uart.display().to_string() }))
        } else {
            Ok(None)
        }
    }
}
