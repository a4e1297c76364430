// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH transport (spec §1 "consumed as a capability": "connect to host:port
//! with identity K and run command C"). Two shapes are needed: a captured
//! one-shot command (container restart, FPGA reset) and an interactive,
//! stdio-inherited tunnel that lives for the user's session (C4's TUNNEL
//! state) — grounded in `vlabstore::capability`'s process-spawn wrapper
//! pattern, generalized to cover both shapes.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use vlabstore::VlabError;

#[async_trait]
pub trait SshTransport: Send + Sync {
    /// Run `command` on `host:port` as `user`, capturing output. Used for
    /// restart/reset invocations where the caller just needs success/failure.
    async fn exec(&self, host: &str, port: u16, user: &str, command: &str) -> Result<String, VlabError>;

    /// Spawn `command` on `host:port` as `user` with the current process's
    /// stdio inherited, so the child becomes the user's interactive session.
    /// Returns the running child so the caller can wait on it concurrently
    /// with a keep-alive loop.
    fn spawn_interactive(
        &self,
        host: &str,
        port: u16,
        user: &str,
        local_forwards: &[(u16, &str, u16)],
        command: &str,
    ) -> Result<Child, VlabError>;
}

/// Shells out to the system `ssh` binary, grounded in the same
/// `tokio::process::Command` wrapper shape as `ProcessHostAgentClient`.
pub struct ProcessSshTransport {
    pub identity: PathBuf,
    pub connect_timeout: std::time::Duration,
}

impl ProcessSshTransport {
    fn base_args(&self, user: &str, host: &str, port: u16) -> Vec<String> {
        vec![
            "-i".to_owned(),
            self.identity.display().to_string(),
            "-p".to_owned(),
            port.to_string(),
            "-o".to_owned(),
            "StrictHostKeyChecking=accept-new".to_owned(),
            "-o".to_owned(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs()),
            format!("{user}@{host}"),
        ]
    }
}

impl ProcessSshTransport {
    fn exec_args(&self, user: &str, host: &str, port: u16, command: &str) -> Vec<String> {
        let mut args = self.base_args(user, host, port);
        args.push(command.to_owned());
        args
    }

    fn interactive_args(&self, user: &str, host: &str, port: u16, local_forwards: &[(u16, &str, u16)], command: &str) -> Vec<String> {
        let mut args = Vec::new();
        for (local_port, remote_host, remote_port) in local_forwards {
            args.push("-L".to_owned());
            args.push(format!("{local_port}:{remote_host}:{remote_port}"));
        }
        args.extend(self.base_args(user, host, port));
        args.push(command.to_owned());
        args
    }
}

#[async_trait]
impl SshTransport for ProcessSshTransport {
    async fn exec(&self, host: &str, port: u16, user: &str, command: &str) -> Result<String, VlabError> {
        let args = self.exec_args(user, host, port, command);
        let output = Command::new("ssh")
            .args(&args)
            .output()
            .await
            .map_err(|e| VlabError::SshFailure(e.to_string()))?;
        if !output.status.success() {
            return Err(VlabError::SshFailure(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn_interactive(
        &self,
        host: &str,
        port: u16,
        user: &str,
        local_forwards: &[(u16, &str, u16)],
        command: &str,
    ) -> Result<Child, VlabError> {
        let args = self.interactive_args(user, host, port, local_forwards, command);
        Command::new("ssh")
            .args(&args)
            .spawn()
            .map_err(|e| VlabError::SshFailure(e.to_string()))
    }
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
