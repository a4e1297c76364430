// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data model shared by every component (spec §3).

use serde::{Deserialize, Serialize};

/// Static per-board metadata, owned by the config-reload operation (C5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownBoard {
    pub serial: String,
    pub class: String,
    pub r#type: String,
    /// Must be power-cycle-reset when released.
    #[serde(default)]
    pub reset: bool,
}

/// A user's permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub overlord: bool,
    #[serde(default)]
    pub allowed_classes: Vec<String>,
}

impl User {
    pub fn may_use_class(&self, class: &str) -> bool {
        self.overlord || self.allowed_classes.iter().any(|c| c == class)
    }
}

/// Outcome of the most recent hardware self-test for a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HwTestOutcome {
    Pass,
    Fail,
}

/// Recorded hardware self-test result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwTestRecord {
    pub outcome: HwTestOutcome,
    /// Epoch seconds.
    pub time: u64,
    pub message: String,
}

/// A lease: "user U holds a board of class C", bounded by `MAX_LOCK_TIME`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub user: String,
    /// Epoch seconds the lock was taken.
    pub time: u64,
}

/// A live user shell on a board; may outlive the lease (§ GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    /// Epoch seconds the session started.
    pub start: u64,
    /// Epoch seconds of the most recent keep-alive ping.
    pub ping: u64,
}

/// Per-serial instance state as observed in the control store (spec §3 `B`).
#[derive(Debug, Clone, Default)]
pub struct BoardInstance {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub lock: Option<Lock>,
    pub session: Option<Session>,
    pub hwtest: Option<HwTestRecord>,
}

/// Tagged-union projection of a board's status, replacing the source's
/// presence/absence-of-keys encoding (design note §9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BoardStatus {
    Available,
    InUseLocked { user: String },
    InUseUnlocked { user: String },
    HwTestFailed,
    Unknown,
}

/// Project the raw key tuple observed for a board into a [`BoardStatus`].
///
/// `in_available`/`in_unlocked` reflect membership in the per-class sorted
/// sets; `lock`/`session`/`hwtest_failed` reflect the instance's own keys.
pub fn project_status(
    in_available: bool,
    in_unlocked: bool,
    lock: Option<&Lock>,
    session: Option<&Session>,
    hwtest_failed: bool,
) -> BoardStatus {
    if hwtest_failed {
        return BoardStatus::HwTestFailed;
    }
    if in_available {
        return BoardStatus::Available;
    }
    if let Some(lock) = lock {
        return BoardStatus::InUseLocked { user: lock.user.clone() };
    }
    if in_unlocked {
        if let Some(session) = session {
            return BoardStatus::InUseUnlocked { user: session.user.clone() };
        }
    }
    BoardStatus::Unknown
}

/// Per-class summary counts for the observability API (spec §4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassSummary {
    pub class: String,
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
    pub in_use_locked: usize,
    pub in_use_unlocked: usize,
    pub hwtest_failed: usize,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
