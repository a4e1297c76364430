// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vlab host-agent` — runs on each board-host (C3): reacts to udev
//! attach/detach events, manages per-board containers, and periodically
//! re-asserts the board's registration. Concurrent invocations for the same
//! serial are serialized with a `flock`'d per-serial lockfile, the
//! cross-process equivalent of the teacher's in-process registries
//! (grounded in `crates/cli/src/transport/inbox.rs::write_inject_entry`,
//! since a host-agent invocation is a fresh OS process per udev event, not
//! a long-lived daemon that could hold an in-memory mutex).

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use nix::fcntl::{Flock, FlockArg};
use vlabstore::VlabError;

use crate::capability::container::{ContainerEngine, DockerContainerEngine};
use crate::capability::device::{DeviceResolver, UdevDeviceResolver};
use crate::config::{LogArgs, StoreArgs};

#[derive(Debug, Clone, Args)]
pub struct HostAgentArgs {
    #[command(subcommand)]
    pub action: HostAgentAction,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub log: LogArgs,

    /// Base directory under which udev creates `<serial>/{jtag,tty}` symlinks.
    #[arg(long, default_value = "/dev/vlab", env = "VLAB_DEVICE_BASE_DIR")]
    pub device_base_dir: PathBuf,

    /// Container image used for per-board containers.
    #[arg(long, default_value = "vlab/boardserver", env = "VLAB_CONTAINER_IMAGE")]
    pub container_image: String,

    /// Directory holding per-serial lockfiles serializing concurrent attach
    /// invocations.
    #[arg(long, default_value = "/var/run/vlab/locks", env = "VLAB_LOCK_DIR")]
    pub lock_dir: PathBuf,

    /// Device-symlink resolution attempts before giving up (spec §4.3
    /// attach point 1, "the device may be enumerated as several nodes that
    /// appear in arbitrary order").
    #[arg(long, default_value_t = 10, env = "VLAB_DEVICE_RETRY_ATTEMPTS")]
    pub device_retry_attempts: u32,

    #[arg(long, default_value_t = 300, env = "VLAB_DEVICE_RETRY_INTERVAL_MS")]
    pub device_retry_interval_ms: u64,

    /// This board-host's address, as published to the control store.
    /// Defaults to the local hostname.
    #[arg(long, env = "VLAB_BOARDHOST_ADDR")]
    pub server: Option<String>,

    /// `vlab` binary path, baked into the re-register cron job's command line.
    #[arg(long, default_value = "vlab", env = "VLAB_BINARY_PATH")]
    pub vlab_binary: String,
}

#[derive(Debug, Clone, clap::Subcommand)]
pub enum HostAgentAction {
    /// Called by the device-event handler when a board's nodes appear.
    Attach { serial: String },
    /// Called by the device-event handler when a board's nodes disappear.
    Detach { serial: String },
    /// Destroy and re-create a board's container in place.
    Restart { serial: String },
    /// Re-publish `server`/`port`; called every minute from inside the container.
    Reassert {
        serial: String,
        #[arg(long)]
        port: u16,
    },
    /// Run the self-test bitstream and print captured UART output.
    Hwtest {
        serial: String,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

fn resolve_server(explicit: Option<String>) -> anyhow::Result<String> {
    if let Some(server) = explicit {
        return Ok(server);
    }
    Ok(nix::unistd::gethostname()?.to_string_lossy().into_owned())
}

/// Acquire an exclusive `flock` on `<lock_dir>/<serial>.lock`, serializing
/// concurrent attach invocations for the same serial (spec §4.3 "Multiple
/// concurrent invocations for the same serial must converge to exactly one
/// container"). The returned guard must be held for the duration of the
/// attach steps and dropped only once the container exists.
fn acquire_serial_lock(lock_dir: &std::path::Path, serial: &str) -> anyhow::Result<Flock<std::fs::File>> {
    std::fs::create_dir_all(lock_dir)?;
    let path = lock_dir.join(format!("{serial}.lock"));
    let file = OpenOptions::new().create(true).write(true).open(&path)?;
    Flock::lock(file, FlockArg::LockExclusive).map_err(|(_file, errno)| anyhow::anyhow!("flock {path:?}: {errno}"))
}

pub async fn run(args: HostAgentArgs) -> i32 {
    args.log.init();

    let lease = match args.store.connect().await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e:#}");
            return 1;
        }
    };

    let container = DockerContainerEngine { image: args.container_image.clone() };
    let resolver = UdevDeviceResolver { base_dir: args.device_base_dir.clone() };

    let result = match &args.action {
        HostAgentAction::Attach { serial } => attach(&args, &lease, &container, &resolver, serial).await,
        HostAgentAction::Detach { serial } => detach(&lease, &container, serial).await,
        HostAgentAction::Restart { serial } => restart(&args, &lease, &container, serial).await,
        HostAgentAction::Reassert { serial, port } => reassert(&args, &lease, serial, *port).await,
        HostAgentAction::Hwtest { serial, timeout_secs } => {
            hwtest(&container, serial, Duration::from_secs(*timeout_secs)).await
        }
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

async fn resolve_devices_with_retry(
    resolver: &UdevDeviceResolver,
    serial: &str,
    attempts: u32,
    interval: Duration,
) -> Result<crate::capability::device::BoardDevices, VlabError> {
    for attempt in 0..attempts {
        if let Some(devices) = resolver.resolve(serial).await? {
            return Ok(devices);
        }
        if attempt + 1 < attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(VlabError::Internal(format!("device nodes for {serial} never appeared")))
}

fn reassert_command(vlab_binary: &str, serial: &str, port: u16) -> String {
    format!("{vlab_binary} host-agent reassert {serial} --port {port}")
}

async fn attach(
    args: &HostAgentArgs,
    lease: &vlabstore::Lease,
    container: &DockerContainerEngine,
    resolver: &UdevDeviceResolver,
    serial: &str,
) -> Result<(), VlabError> {
    let store = lease.store();
    use vlabstore::Store;
    let class = store
        .get(&vlabstore::keys::board_class(serial))
        .await?
        .ok_or_else(|| VlabError::UnknownBoard(serial.to_owned()))?;
    let reset = store.get(&vlabstore::keys::board_reset(serial)).await?.as_deref() == Some("true");

    let devices = resolve_devices_with_retry(
        resolver,
        serial,
        args.device_retry_attempts,
        Duration::from_millis(args.device_retry_interval_ms),
    )
    .await?;

    let _lock = acquire_serial_lock(&args.lock_dir, serial).map_err(|e| VlabError::Internal(e.to_string()))?;

    container.ensure_absent(serial).await?;
    let port = container.create(serial, &devices.jtag, &devices.uart).await?;
    let server = resolve_server(args.server.clone()).map_err(|e| VlabError::Internal(e.to_string()))?;

    container.install_reassert_cron(serial, &reassert_command(&args.vlab_binary, serial, port)).await?;

    if reset {
        container.reset(serial).await?;
    }

    lease.attach_board(serial, &class, &server, port).await?;
    tracing::info!(serial, class, server, port, "host-agent attach complete");
    Ok(())
}

async fn detach(lease: &vlabstore::Lease, container: &DockerContainerEngine, serial: &str) -> Result<(), VlabError> {
    use vlabstore::Store;
    let store = lease.store();
    let class = store.get(&vlabstore::keys::board_class(serial)).await?;
    container.destroy(serial).await?;
    if let Some(class) = class {
        lease.detach_board(serial, &class).await?;
    }
    tracing::info!(serial, "host-agent detach complete");
    Ok(())
}

async fn restart(
    args: &HostAgentArgs,
    lease: &vlabstore::Lease,
    container: &DockerContainerEngine,
    serial: &str,
) -> Result<(), VlabError> {
    use vlabstore::Store;
    let store = lease.store();
    if store.get(&vlabstore::keys::board_class(serial)).await?.is_none() {
        return Err(VlabError::UnknownBoard(serial.to_owned()));
    }

    // The board is still attached (this isn't a detach/attach cycle), so its
    // device nodes are already present; resolve them the same way attach does.
    let resolver = UdevDeviceResolver { base_dir: args.device_base_dir.clone() };
    let devices = resolve_devices_with_retry(&resolver, serial, args.device_retry_attempts, Duration::from_millis(args.device_retry_interval_ms))
        .await?;

    let _lock = acquire_serial_lock(&args.lock_dir, serial).map_err(|e| VlabError::Internal(e.to_string()))?;

    container.ensure_absent(serial).await?;
    let port = container.create(serial, &devices.jtag, &devices.uart).await?;
    container.install_reassert_cron(serial, &reassert_command(&args.vlab_binary, serial, port)).await?;
    // Resetting is the relay's responsibility on a fresh lease (spec §4.4);
    // restart only destroys/re-creates/re-reads the port and re-cron's.

    let server = resolve_server(args.server.clone()).map_err(|e| VlabError::Internal(e.to_string()))?;
    lease.reassert_board(serial, &server, port).await?;
    tracing::info!(serial, port, "host-agent restart complete");
    Ok(())
}

async fn reassert(args: &HostAgentArgs, lease: &vlabstore::Lease, serial: &str, port: u16) -> Result<(), VlabError> {
    let server = resolve_server(args.server.clone()).map_err(|e| VlabError::Internal(e.to_string()))?;
    lease.reassert_board(serial, &server, port).await
}

async fn hwtest(container: &DockerContainerEngine, serial: &str, timeout: Duration) -> Result<(), VlabError> {
    let output = container.run_self_test(serial, timeout).await?;
    print!("{output}");
    Ok(())
}

#[cfg(test)]
#[path = "host_agent_tests.rs"]
mod tests;
