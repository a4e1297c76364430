// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-board container lifecycle (spec §1 "consumed as an
//! attach(serial)/restart(serial)/detach(serial) capability on a named
//! board-host"), grounded in `vlabstore::capability`'s process-spawn
//! wrapper shape.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use vlabstore::VlabError;

fn container_name(serial: &str) -> String {
    format!("cnt-{serial}")
}

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Destroy `cnt-<serial>` if it exists; a no-op if it doesn't.
    async fn ensure_absent(&self, serial: &str) -> Result<(), VlabError>;

    /// Create a fresh container mapped to the two device nodes, publishing
    /// SSH to an ephemeral host port. Returns that host port.
    async fn create(&self, serial: &str, jtag_device: &str, uart_device: &str) -> Result<u16, VlabError>;

    async fn destroy(&self, serial: &str) -> Result<(), VlabError>;

    /// Run the FPGA power-cycle reset command inside the board's container.
    async fn reset(&self, serial: &str) -> Result<(), VlabError>;

    /// Install (or overwrite) the in-container periodic job that re-asserts
    /// the board's `server`/`port` registration (spec §4.3 point 4).
    async fn install_reassert_cron(&self, serial: &str, command: &str) -> Result<(), VlabError>;

    /// Run the known self-test bitstream and capture UART output for a
    /// bounded window (spec §4.5 "hardware self-test").
    async fn run_self_test(&self, serial: &str, timeout: Duration) -> Result<String, VlabError>;
}

/// Shells out to the Docker CLI — the idiomatic default for a single-host
/// container engine capability in this corpus.
pub struct DockerContainerEngine {
    pub image: String,
}

async fn run(args: &[&str]) -> Result<std::process::Output, VlabError> {
    Command::new("docker").args(args).output().await.map_err(|e| VlabError::ContainerFailure(e.to_string()))
}

#[async_trait]
impl ContainerEngine for DockerContainerEngine {
    async fn ensure_absent(&self, serial: &str) -> Result<(), VlabError> {
        let name = container_name(serial);
        let inspect = run(&["inspect", &name]).await?;
        if !inspect.status.success() {
            return Ok(());
        }
        let rm = run(&["rm", "-f", &name]).await?;
        if !rm.status.success() {
            return Err(VlabError::ContainerFailure(String::from_utf8_lossy(&rm.stderr).into_owned()));
        }
        Ok(())
    }

    async fn create(&self, serial: &str, jtag_device: &str, uart_device: &str) -> Result<u16, VlabError> {
        let name = container_name(serial);
        // The UART node is remapped to a fixed in-container path; the
        // reset command and the UART screen session both expect it there.
        let uart_mapping = format!("{uart_device}:/dev/ttyFPGA");
        let create = run(&[
            "run",
            "-d",
            "--name",
            &name,
            "--device",
            jtag_device,
            "--device",
            &uart_mapping,
            "-p",
            "22",
            &self.image,
        ])
        .await?;
        if !create.status.success() {
            return Err(VlabError::ContainerFailure(String::from_utf8_lossy(&create.stderr).into_owned()));
        }

        let port_output = run(&["port", &name, "22"]).await?;
        if !port_output.status.success() {
            return Err(VlabError::ContainerFailure(String::from_utf8_lossy(&port_output.stderr).into_owned()));
        }
        let text = String::from_utf8_lossy(&port_output.stdout);
        parse_mapped_port(&text)
    }

    async fn destroy(&self, serial: &str) -> Result<(), VlabError> {
        let rm = run(&["rm", "-f", &container_name(serial)]).await?;
        if !rm.status.success() {
            return Err(VlabError::ContainerFailure(String::from_utf8_lossy(&rm.stderr).into_owned()));
        }
        Ok(())
    }

    async fn reset(&self, serial: &str) -> Result<(), VlabError> {
        let name = container_name(serial);
        let out = run(&["exec", &name, "/bin/sh", "-c", "/opt/xsct/bin/xsdb /vlab/reset.tcl"]).await?;
        if !out.status.success() {
            return Err(VlabError::ContainerFailure(String::from_utf8_lossy(&out.stderr).into_owned()));
        }
        Ok(())
    }

    async fn install_reassert_cron(&self, serial: &str, command: &str) -> Result<(), VlabError> {
        let name = container_name(serial);
        let crontab_line = format!("* * * * * root {command}");
        let shell = format!("echo '{crontab_line}' > /etc/cron.d/vlab-cron");
        let out = run(&["exec", &name, "/bin/sh", "-c", &shell]).await?;
        if !out.status.success() {
            return Err(VlabError::ContainerFailure(String::from_utf8_lossy(&out.stderr).into_owned()));
        }
        Ok(())
    }

    async fn run_self_test(&self, serial: &str, timeout: Duration) -> Result<String, VlabError> {
        let name = container_name(serial);
        let shell = format!(
            "/opt/xsct/bin/xsdb /vlab/hwtest.tcl; timeout {secs} cat /dev/ttyFPGA",
            secs = timeout.as_secs()
        );
        let out = run(&["exec", &name, "/bin/sh", "-c", &shell]).await?;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// `docker port <name> 22` prints lines like `0.0.0.0:32768`; take the
/// last colon-delimited field of the first line.
fn parse_mapped_port(text: &str) -> Result<u16, VlabError> {
    let first_line = text.lines().next().unwrap_or_default();
    first_line
        .rsplit(':')
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(|| VlabError::ContainerFailure(format!("could not parse mapped port from {text:?}")))
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
