// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vlab relay` — the forced SSH command the relay host runs per user
//! connection (C4). Drives NEW → AUTH → ALLOCATE → PROVISION → TUNNEL →
//! KEEPALIVE ⟲ → RELEASE → DONE, the coroutine-style keep-alive grounded in
//! the teacher's `Session::run` select-over-{child-exit, timer} loop
//! (`crates/cli/src/session.rs`).

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use vlabstore::capability::{SshHostAgentClient, SshResetCommand};
use vlabstore::{Guard, HostAgentClient, Lease, ResetCommand, Store, VlabError};

use crate::capability::ssh::{ProcessSshTransport, SshTransport};
use crate::config::{resolve_user, LogArgs, StoreArgs};

#[derive(Debug, Clone, Args)]
pub struct RelayArgs {
    /// The forced command's single argument: `getport`, `class:port`, or
    /// (overlord only) `class:port:serial`.
    pub arg: String,

    /// Overrides the OS user resolved from the forced command's uid — used
    /// in development where the relay isn't invoked through sshd.
    #[arg(long, env = "VLAB_USER")]
    pub user: Option<String>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub log: LogArgs,

    /// Identity file used to SSH into board-hosts.
    #[arg(long, default_value = "/vlab/keys/id_rsa", env = "VLAB_BOARDHOST_KEY")]
    pub board_host_key: PathBuf,

    /// Path to the append-only access log.
    #[arg(long, env = "VLAB_ACCESS_LOG_PATH")]
    pub access_log_path: PathBuf,

    /// `vlab` binary path used to restart containers / run resets on the
    /// board-host over SSH.
    #[arg(long, default_value = "vlab", env = "VLAB_BINARY_PATH")]
    pub vlab_binary: String,

    /// Xilinx hardware-server port inside the container (spec §1).
    #[arg(long, default_value_t = 3121)]
    pub hwserver_port: u16,

    /// Web-forward port, tunnelled alongside the hw-server port.
    #[arg(long, default_value_t = 9001, env = "VLAB_WEB_FORWARD_PORT")]
    pub web_forward_port: u16,

    /// Class-lease expiry, in seconds (spec §5 `MAX_LOCK_TIME`).
    #[arg(long, default_value_t = 600, env = "VLAB_MAX_LOCK_TIME_SECS")]
    pub max_lock_time_secs: u64,

    /// Keep-alive cadence, in seconds (spec §5 `PING_INTERVAL`).
    #[arg(long, default_value_t = 10, env = "VLAB_PING_INTERVAL_SECS")]
    pub ping_interval_secs: u64,

    /// `locking[C]` coarse-serialization TTL, in seconds (spec §5 `LOCKING_TTL`).
    #[arg(long, default_value_t = 2, env = "VLAB_LOCKING_TTL_SECS")]
    pub locking_ttl_secs: u64,

    /// SSH connect timeout, in seconds.
    #[arg(long, default_value_t = 30, env = "VLAB_SSH_TIMEOUT_SECS")]
    pub ssh_timeout_secs: u64,

    /// Ephemeral port-counter range (spec §5 `[PORT_LO, PORT_HI)`).
    #[arg(long, default_value_t = 30000, env = "VLAB_PORT_LO")]
    pub port_lo: u16,
    #[arg(long, default_value_t = 35000, env = "VLAB_PORT_HI")]
    pub port_hi: u16,
}

/// The parsed forced-command argument (spec §6 grammar).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Grammar {
    GetPort,
    Allocate { class: String, tunnel_port: u16, serial: Option<String> },
}

fn parse_grammar(arg: &str) -> Result<Grammar, VlabError> {
    if arg == "getport" {
        return Ok(Grammar::GetPort);
    }
    let mut parts = arg.splitn(3, ':');
    let class = parts.next().filter(|s| !s.is_empty());
    let port = parts.next();
    let serial = parts.next();
    match (class, port) {
        (Some(class), Some(port)) => {
            let tunnel_port: u16 = port
                .parse()
                .map_err(|_| VlabError::Internal(format!("invalid forced-command argument: {arg:?}")))?;
            Ok(Grammar::Allocate { class: class.to_owned(), tunnel_port, serial: serial.map(str::to_owned) })
        }
        _ => Err(VlabError::Internal(format!("invalid forced-command argument: {arg:?}"))),
    }
}

pub async fn run(args: RelayArgs) -> i32 {
    args.log.init();

    let user = match resolve_user(args.user.clone()) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e:#}");
            return 1;
        }
    };

    let lease = match args.store.connect().await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e:#}");
            return 1;
        }
    };

    let grammar = match parse_grammar(&args.arg) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    match grammar {
        Grammar::GetPort => match lease.next_port(args.port_lo, args.port_hi).await {
            Ok(port) => {
                println!("VLABPORT:{port}");
                0
            }
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        },
        Grammar::Allocate { class, tunnel_port, serial } => {
            match allocate_and_serve(&args, &lease, &user, &class, tunnel_port, serial.as_deref()).await {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
    }
}

async fn check_authorized(lease: &Lease, user: &str, class: &str, requesting_serial: bool) -> Result<(), VlabError> {
    let store = lease.store();
    if !store.sismember(vlabstore::keys::USERS, user).await? {
        return Err(VlabError::UnknownUser(user.to_owned()));
    }
    if !store.sismember(vlabstore::keys::BOARDCLASSES, class).await? {
        return Err(VlabError::UnknownClass(class.to_owned()));
    }
    let overlord = store.get(&vlabstore::keys::user_overlord(user)).await?.is_some();
    if requesting_serial && !overlord {
        return Err(VlabError::Unauthorized("only overlord users may request a specific board".to_owned()));
    }
    if !overlord {
        let allowed = store.get(&vlabstore::keys::user_allowedclasses(user)).await?.unwrap_or_default();
        if !allowed.split(',').any(|c| c == class) {
            return Err(VlabError::Unauthorized(format!("{user} is not permitted to use class {class}")));
        }
    }
    Ok(())
}

/// Allocation policy (spec §4.4, first hit wins).
async fn allocate_board(
    lease: &Lease,
    user: &str,
    class: &str,
    requested_serial: Option<&str>,
    locking_ttl: Duration,
) -> Result<String, VlabError> {
    if let Some(serial) = requested_serial {
        if let Some(lock) = lease.read_lock(serial).await? {
            if lock.user == user {
                return Ok(serial.to_owned());
            }
        }
        if let Some(session) = lease.read_session(serial).await? {
            if session.user == user {
                return Ok(serial.to_owned());
            }
        }
        let claimed = lease.store().zrem(&vlabstore::keys::class_unlocked(class), serial).await?;
        if claimed {
            return Ok(serial.to_owned());
        }
        let owner = lease.read_lock(serial).await?.map(|l| l.user);
        let msg = match owner {
            Some(owner) => format!("board {serial} is locked by {owner}"),
            None => format!("board {serial} is not currently available"),
        };
        return Err(VlabError::Unauthorized(msg));
    }

    lease.set_locking_token(class, locking_ttl).await?;

    let store = lease.store();
    for serial in store.smembers(&vlabstore::keys::class_boards(class)).await? {
        let owned_by_lock = lease.read_lock(&serial).await?.is_some_and(|l| l.user == user);
        let owned_by_session = lease.read_session(&serial).await?.is_some_and(|s| s.user == user);
        if owned_by_lock || owned_by_session {
            return Ok(serial);
        }
    }

    if let Some(serial) = lease.allocate_available(class).await? {
        return Ok(serial);
    }
    if let Some(serial) = lease.allocate_unlocked(class).await? {
        return Ok(serial);
    }
    Err(VlabError::NoFreeBoards(class.to_owned()))
}

async fn allocate_and_serve(
    args: &RelayArgs,
    lease: &Lease,
    user: &str,
    class: &str,
    tunnel_port: u16,
    requested_serial: Option<&str>,
) -> Result<i32, VlabError> {
    let access_log = vlabstore::access_log::AccessLogWriter::new(&args.access_log_path, "relay");

    if let Err(e) = check_authorized(lease, user, class, requested_serial.is_some()).await {
        eprintln!("error: {e}");
        return Ok(1);
    }

    let serial = match allocate_board(lease, user, class, requested_serial, Duration::from_secs(args.locking_ttl_secs)).await {
        Ok(s) => s,
        Err(VlabError::NoFreeBoards(class)) => {
            let _ = access_log.log(&vlabstore::access_log::AccessEvent::NoFreeBoards { user: user.to_owned(), class: class.clone() });
            eprintln!("all boards of type {class} are locked; try again in ~10 minutes");
            return Ok(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(1);
        }
    };

    let t = vlabstore::lease::now_epoch();
    lease.start_session(&serial, class, user, t).await?;
    let remaining = lease.store().zcard(&vlabstore::keys::class_unlocked(class)).await.unwrap_or(0);
    let _ = access_log.log(&vlabstore::access_log::AccessEvent::Lock {
        user: user.to_owned(),
        class: class.to_owned(),
        serial: serial.clone(),
        remaining: remaining as u64,
    });
    let _ = access_log.log(&vlabstore::access_log::AccessEvent::Start {
        user: user.to_owned(),
        class: class.to_owned(),
        serial: serial.clone(),
    });

    let guard = Guard { user: user.to_owned(), time: t };

    let host_agent = SshHostAgentClient {
        store: lease.store(),
        identity: args.board_host_key.clone(),
        vlab_binary: args.vlab_binary.clone(),
    };
    if let Err(e) = host_agent.restart(&serial).await {
        lease.unlock_board_if_user_and_time(&serial, class, &guard).await.ok();
        lease.end_session_if_user_and_time(&serial, class, &guard).await.ok();
        return Err(e);
    }

    tokio::time::sleep(Duration::from_secs(2)).await;

    let store = lease.store();
    let server = store
        .get(&vlabstore::keys::board_server(&serial))
        .await?
        .ok_or_else(|| VlabError::UnknownBoard(serial.clone()))?;
    let port: u16 = store
        .get(&vlabstore::keys::board_port(&serial))
        .await?
        .ok_or_else(|| VlabError::UnknownBoard(serial.clone()))?
        .parse()
        .map_err(|_| VlabError::Internal(format!("corrupt port for {serial}")))?;
    let reset = store.get(&vlabstore::keys::board_reset(&serial)).await?.as_deref() == Some("true");

    if reset {
        let reset_cmd = SshResetCommand { store: lease.store(), identity: args.board_host_key.clone(), vlab_binary: args.vlab_binary.clone() };
        reset_cmd.reset(&serial).await?;
    }

    let transport = ProcessSshTransport { identity: args.board_host_key.clone(), connect_timeout: Duration::from_secs(args.ssh_timeout_secs) };
    let command = format!(
        "export VLAB_CAPTION='{user} {class}:{serial} expires in {max}s'; screen -c /vlab/vlabscreenrc -qdRR - /dev/ttyFPGA 115200; killall -q screen",
        max = args.max_lock_time_secs,
    );
    let mut child = transport.spawn_interactive(
        &server,
        port,
        "root",
        &[(tunnel_port, "localhost", args.hwserver_port), (args.web_forward_port, "localhost", args.web_forward_port)],
        &command,
    )?;

    let mut ticker = tokio::time::interval(Duration::from_secs(args.ping_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut preempted = false;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = vlabstore::lease::now_epoch();
                if now.saturating_sub(t) > args.max_lock_time_secs {
                    lease.unlock_board_if_user_and_time(&serial, class, &guard).await.ok();
                }
                match lease.ping_session_if_user_and_time(&serial, &guard).await {
                    Ok(true) => {}
                    _ => {
                        preempted = true;
                        let _ = child.start_kill();
                        eprintln!("your lock has expired and the board was taken by another user");
                        break;
                    }
                }
            }
            status = child.wait() => {
                let _ = status;
                break;
            }
        }
    }
    if !preempted {
        let _ = child.wait().await;
    }

    if reset {
        let reset_cmd = SshResetCommand { store: lease.store(), identity: args.board_host_key.clone(), vlab_binary: args.vlab_binary.clone() };
        let _ = reset_cmd.reset(&serial).await;
    }
    lease.unlock_board_if_user_and_time(&serial, class, &guard).await.ok();
    lease.end_session_if_user_and_time(&serial, class, &guard).await.ok();
    let _ = access_log.log(&vlabstore::access_log::AccessEvent::Release { user: user.to_owned(), class: class.to_owned(), serial: serial.clone() });
    let _ = access_log.log(&vlabstore::access_log::AccessEvent::End { user: user.to_owned(), class: class.to_owned(), serial });

    Ok(0)
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
