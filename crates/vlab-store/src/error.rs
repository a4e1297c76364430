// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Unified error taxonomy shared by the relay, host agent, and observability
/// API (spec §7). Each variant carries enough context to log and to decide
/// an HTTP status / process exit code without re-deriving it at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VlabError {
    /// The control store could not be reached after the configured retry budget.
    StoreUnavailable,
    /// A transaction's watched key changed before `EXEC`; the caller may retry.
    Conflict,
    /// Referenced user is not present in the user set.
    UnknownUser(String),
    /// Referenced board class is not present in the board-class set.
    UnknownClass(String),
    /// Referenced board serial is not known.
    UnknownBoard(String),
    /// The requesting user is not permitted to use the given class, or
    /// requested a specific serial without the overlord flag.
    Unauthorized(String),
    /// No board of the requested class is currently available or unlockable.
    NoFreeBoards(String),
    /// The container engine returned a non-zero exit for an attach/restart/detach.
    ContainerFailure(String),
    /// SSH to a board-host or container failed; `detail` is the raw stderr
    /// fragment used to classify the failure into actionable advice.
    SshFailure(String),
    /// Internal/unexpected condition.
    Internal(String),
}

impl VlabError {
    /// HTTP status code for the observability API (C6).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::StoreUnavailable => 503,
            Self::Conflict => 409,
            Self::UnknownUser(_) | Self::UnknownClass(_) | Self::UnknownBoard(_) => 404,
            Self::Unauthorized(_) => 401,
            Self::NoFreeBoards(_) => 503,
            Self::ContainerFailure(_) => 502,
            Self::SshFailure(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Process exit code for the relay shell / host agent (C4/C3).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StoreUnavailable => 1,
            Self::Conflict => 1,
            Self::UnknownUser(_) | Self::UnknownClass(_) | Self::UnknownBoard(_) => 1,
            Self::Unauthorized(_) => 1,
            Self::NoFreeBoards(_) => 1,
            Self::ContainerFailure(_) => 1,
            Self::SshFailure(_) => 1,
            Self::Internal(_) => 1,
        }
    }

    /// Machine-readable code, used as the access-log/API error tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::Conflict => "CONFLICT",
            Self::UnknownUser(_) => "UNKNOWN_USER",
            Self::UnknownClass(_) => "UNKNOWN_CLASS",
            Self::UnknownBoard(_) => "UNKNOWN_BOARD",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NoFreeBoards(_) => "NO_FREE_BOARDS",
            Self::ContainerFailure(_) => "CONTAINER_FAILURE",
            Self::SshFailure(_) => "SSH_FAILURE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl fmt::Display for VlabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUnavailable => write!(f, "control store unavailable"),
            Self::Conflict => write!(f, "transaction conflict"),
            Self::UnknownUser(u) => write!(f, "unknown user: {u}"),
            Self::UnknownClass(c) => write!(f, "unknown board class: {c}"),
            Self::UnknownBoard(b) => write!(f, "unknown board: {b}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::NoFreeBoards(c) => {
                write!(f, "all boards of type {c} are locked; try again later")
            }
            Self::ContainerFailure(msg) => write!(f, "container engine failure: {msg}"),
            Self::SshFailure(msg) => write!(f, "ssh failure: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for VlabError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
