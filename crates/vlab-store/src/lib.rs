// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control store client (C1), lease primitives (C2), data model, and
//! supporting ambient services (access log, configuration document) shared
//! by the `vlabd` daemon and the `vlab` CLI.

pub mod access_log;
pub mod capability;
pub mod config_doc;
pub mod error;
pub mod fake_store;
pub mod keys;
pub mod lease;
pub mod redis_store;
pub mod store;
pub mod types;

pub use capability::{
    HostAgentClient, HwTestRunner, ProcessHostAgentClient, ProcessHwTestRunner, ProcessResetCommand,
    ResetCommand,
};
pub use error::VlabError;
pub use lease::{Guard, Lease};
pub use redis_store::{RedisConfig, RedisStore};
pub use store::Store;
