// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-scope collaborators (spec §1): container lifecycle and the
//! per-board FPGA reset command are consumed as capabilities, not built
//! here. The process-spawning default impls shell out to the `vlab`
//! binary's own subcommands, the way the teacher's relay consumes
//! `SshTunnel`/`ResetCommand` as process-spawn wrappers (SPEC_FULL.md §4.4).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::VlabError;
use crate::keys;
use crate::store::Store;

/// "restart(serial)" — destroy and re-create a board's container, used by
/// C4 on every new lease and by C5's sweeper to recover an orphaned board.
#[async_trait]
pub trait HostAgentClient: Send + Sync {
    async fn restart(&self, serial: &str) -> Result<(), VlabError>;
}

/// The FPGA power-cycle reset command run on boards flagged `reset = true`.
#[async_trait]
pub trait ResetCommand: Send + Sync {
    async fn reset(&self, serial: &str) -> Result<(), VlabError>;
}

async fn run(binary: &PathBuf, args: &[&str]) -> Result<(), VlabError> {
    let status = Command::new(binary)
        .args(args)
        .status()
        .await
        .map_err(|e| VlabError::ContainerFailure(e.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(VlabError::ContainerFailure(format!("{binary:?} {args:?} exited with {status}")))
    }
}

/// Shells out to `<binary> host-agent restart <serial>`.
pub struct ProcessHostAgentClient {
    pub binary: PathBuf,
}

#[async_trait]
impl HostAgentClient for ProcessHostAgentClient {
    async fn restart(&self, serial: &str) -> Result<(), VlabError> {
        run(&self.binary, &["host-agent", "restart", serial]).await
    }
}

/// Shells out to `<binary> reset <serial>`.
pub struct ProcessResetCommand {
    pub binary: PathBuf,
}

#[async_trait]
impl ResetCommand for ProcessResetCommand {
    async fn reset(&self, serial: &str) -> Result<(), VlabError> {
        run(&self.binary, &["reset", serial]).await
    }
}

/// Looks up `server`/`port` for `serial` and runs `ssh -p <port> root@<server>
/// <command>`, capturing combined output. The board-host login is always
/// `root` (the account the per-board container image provisions), matching
/// the original host agent's constant login.
async fn ssh_exec(store: &Arc<dyn Store>, identity: &PathBuf, serial: &str, command: &str) -> Result<String, VlabError> {
    let server = store
        .get(&keys::board_server(serial))
        .await?
        .ok_or_else(|| VlabError::UnknownBoard(serial.to_owned()))?;
    let port = store
        .get(&keys::board_port(serial))
        .await?
        .ok_or_else(|| VlabError::UnknownBoard(serial.to_owned()))?;
    let output = Command::new("ssh")
        .args([
            "-i",
            &identity.display().to_string(),
            "-p",
            &port,
            "-o",
            "StrictHostKeyChecking=accept-new",
            &format!("root@{server}"),
            command,
        ])
        .output()
        .await
        .map_err(|e| VlabError::SshFailure(e.to_string()))?;
    if !output.status.success() {
        return Err(VlabError::SshFailure(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// SSHes to the board's own host and runs `<vlab_binary> host-agent restart
/// <serial>` there, for deployments where the caller (vlabd's janitors,
/// the relay) runs on a different machine than the board-host.
pub struct SshHostAgentClient {
    pub store: Arc<dyn Store>,
    pub identity: PathBuf,
    pub vlab_binary: String,
}

#[async_trait]
impl HostAgentClient for SshHostAgentClient {
    async fn restart(&self, serial: &str) -> Result<(), VlabError> {
        let command = format!("{} host-agent restart {serial}", self.vlab_binary);
        ssh_exec(&self.store, &self.identity, serial, &command).await.map(|_| ())
    }
}

/// SSHes to the board's own host and runs `<vlab_binary> reset <serial>`
/// there, the remote-deployment counterpart to [`ProcessResetCommand`].
pub struct SshResetCommand {
    pub store: Arc<dyn Store>,
    pub identity: PathBuf,
    pub vlab_binary: String,
}

#[async_trait]
impl ResetCommand for SshResetCommand {
    async fn reset(&self, serial: &str) -> Result<(), VlabError> {
        let command = format!("{} reset {serial}", self.vlab_binary);
        ssh_exec(&self.store, &self.identity, serial, &command).await.map(|_| ())
    }
}

/// SSH into a board's container, run the known self-test bitstream, and
/// capture its serial output for a bounded window (spec §4.5 "hardware
/// self-test").
#[async_trait]
pub trait HwTestRunner: Send + Sync {
    async fn run_self_test(&self, serial: &str, timeout: std::time::Duration) -> Result<String, VlabError>;
}

/// Shells out to `<binary> host-agent hwtest <serial> --timeout-secs <n>`,
/// returning its captured stdout.
pub struct ProcessHwTestRunner {
    pub binary: PathBuf,
}

#[async_trait]
impl HwTestRunner for ProcessHwTestRunner {
    async fn run_self_test(&self, serial: &str, timeout: std::time::Duration) -> Result<String, VlabError> {
        let output = Command::new(&self.binary)
            .args(["host-agent", "hwtest", serial, "--timeout-secs", &timeout.as_secs().to_string()])
            .output()
            .await
            .map_err(|e| VlabError::SshFailure(e.to_string()))?;
        if !output.status.success() {
            return Err(VlabError::SshFailure(format!(
                "hwtest for {serial} exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
