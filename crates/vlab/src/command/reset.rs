// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vlab reset` — power-cycles a board's FPGA by running the reset command
//! inside its container. This is the process invoked locally on the
//! board-host, either directly by an operator or remotely via
//! `vlabstore::capability::SshResetCommand` (spec §4.3 "reset").

use clap::Args;

use crate::capability::container::{ContainerEngine, DockerContainerEngine};

#[derive(Debug, Clone, Args)]
pub struct ResetArgs {
    pub serial: String,

    /// Container image used for per-board containers (only consulted if the
    /// container needs recreating; `reset` itself execs into the existing one).
    #[arg(long, default_value = "vlab/boardserver", env = "VLAB_CONTAINER_IMAGE")]
    pub container_image: String,
}

pub async fn run(args: ResetArgs) -> i32 {
    let container = DockerContainerEngine { image: args.container_image };
    match container.reset(&args.serial).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}
