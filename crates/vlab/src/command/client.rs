// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vlab client` — the user-side launcher (C7): obtains an ephemeral relay
//! port, then opens the tunnel that forwards JTAG and UART ports locally.
//! Grounded in the original client launcher's two-step connect
//! (`vlab.py`): `getport` first, then a single interactive SSH carrying
//! both local forwards and the allocation request.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::capability::ssh::{ProcessSshTransport, SshTransport};

#[derive(Debug, Clone, Args)]
pub struct ClientArgs {
    /// Relay host to connect to.
    #[arg(long)]
    pub relay: String,

    /// Relay SSH port.
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Local port to forward the board's hw-server port to.
    #[arg(long)]
    pub localport: u16,

    /// Local port to forward the web-forward port to.
    #[arg(long)]
    pub webport: u16,

    /// SSH identity file.
    #[arg(long)]
    pub key: PathBuf,

    /// User to connect as.
    #[arg(long)]
    pub user: String,

    /// Board class to request.
    #[arg(long)]
    pub board: String,

    /// Request a specific serial (overlord only).
    #[arg(long)]
    pub serial: Option<String>,

    #[arg(long)]
    pub verbose: bool,

    #[arg(long, default_value_t = 30)]
    pub connect_timeout_secs: u64,

    /// Remote web-forward port (spec §1/§6).
    #[arg(long, default_value_t = 9001)]
    pub remote_webport: u16,
}

fn refuse_if_bound(port: u16) -> anyhow::Result<()> {
    TcpListener::bind(("127.0.0.1", port))
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("local port {port} is already bound: {e}"))
}

fn parse_vlabport(output: &str) -> anyhow::Result<u16> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("VLABPORT:"))
        .ok_or_else(|| anyhow::anyhow!("unexpected getport response: {output:?}"))?
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid VLABPORT value: {e}"))
}

fn allocation_arg(board: &str, tunnel_port: u16, serial: Option<&str>) -> String {
    match serial {
        Some(serial) => format!("{board}:{tunnel_port}:{serial}"),
        None => format!("{board}:{tunnel_port}"),
    }
}

pub async fn run(args: ClientArgs) -> i32 {
    if args.verbose {
        eprintln!("vlab client: connecting to {}@{}:{}", args.user, args.relay, args.port);
    }

    if let Err(e) = refuse_if_bound(args.localport).and_then(|_| refuse_if_bound(args.webport)) {
        eprintln!("error: {e}");
        return 1;
    }

    let transport = ProcessSshTransport { identity: args.key.clone(), connect_timeout: Duration::from_secs(args.connect_timeout_secs) };

    let getport_output = match transport.exec(&args.relay, args.port, &args.user, "getport").await {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let tunnel_port = match parse_vlabport(&getport_output) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    if args.verbose {
        eprintln!("vlab client: allocated relay tunnel port {tunnel_port}");
    }

    let command = allocation_arg(&args.board, tunnel_port, args.serial.as_deref());
    let forwards = [(args.localport, "localhost", tunnel_port), (args.webport, "localhost", args.remote_webport)];
    let mut child = match transport.spawn_interactive(&args.relay, args.port, &args.user, &forwards, &command) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    match child.wait().await {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
