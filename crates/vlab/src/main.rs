// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

#[derive(Parser)]
#[command(name = "vlab", version, about = "Distributed FPGA board lease and session coordinator.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// The forced SSH command run per user connection on the relay host.
    Relay(vlab::command::relay::RelayArgs),
    /// Runs on each board-host; reacts to udev attach/detach events.
    HostAgent(vlab::command::host_agent::HostAgentArgs),
    /// The user-side launcher: allocates a board and opens the tunnel.
    Client(vlab::command::client::ClientArgs),
    /// Operator wrapper around the observability HTTP API.
    Manage(vlab::command::manage::ManageArgs),
    /// Power-cycles a board's FPGA via its container.
    Reset(vlab::command::reset::ResetArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Relay(args) => vlab::command::relay::run(args).await,
        Commands::HostAgent(args) => vlab::command::host_agent::run(args).await,
        Commands::Client(args) => vlab::command::client::run(args).await,
        Commands::Manage(args) => vlab::command::manage::run(args).await,
        Commands::Reset(args) => vlab::command::reset::run(args).await,
    };

    std::process::exit(code);
}
