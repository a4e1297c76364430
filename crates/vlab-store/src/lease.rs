// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease primitives (C2) — THE core subsystem. Every lock/session mutation
//! in the system goes through a [`Lease`] method; nothing else is allowed to
//! poke the raw `lock.*`/`session.*` keys directly (SPEC_FULL.md §4.2
//! "guard-and-act... never expose the raw set/del pair" design note).
//!
//! All conditional (`*IfUser*`) variants take a single guard value instead
//! of loose `user`/`time` arguments, so a caller can't accidentally compare
//! the wrong pair.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::VlabError;
use crate::keys;
use crate::store::Store;
use crate::types::{Lock, Session};

/// Identity + timestamp a conditional operation is guarded on (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub user: String,
    pub time: u64,
}

pub fn now_epoch() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs()
}

/// The lease primitives, built on top of a [`Store`].
pub struct Lease {
    store: Arc<dyn Store>,
}

impl Lease {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Access to the underlying store for reads that aren't lease mutations
    /// (user/class lookups, board metadata) — per design note §9, only
    /// conditional *mutations* are required to go through a guarded method.
    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub async fn read_lock(&self, serial: &str) -> Result<Option<Lock>, VlabError> {
        let user = self.store.get(&keys::board_lock_user(serial)).await?;
        let time = self.store.get(&keys::board_lock_time(serial)).await?;
        match (user, time) {
            (Some(user), Some(time)) => {
                let time = time.parse().map_err(|_| VlabError::Internal(format!("corrupt lock.time for {serial}")))?;
                Ok(Some(Lock { user, time }))
            }
            _ => Ok(None),
        }
    }

    pub async fn read_session(&self, serial: &str) -> Result<Option<Session>, VlabError> {
        let user = self.store.get(&keys::board_session_user(serial)).await?;
        let start = self.store.get(&keys::board_session_start(serial)).await?;
        let ping = self.store.get(&keys::board_session_ping(serial)).await?;
        match (user, start, ping) {
            (Some(user), Some(start), Some(ping)) => {
                let start = start
                    .parse()
                    .map_err(|_| VlabError::Internal(format!("corrupt session.start for {serial}")))?;
                let ping = ping
                    .parse()
                    .map_err(|_| VlabError::Internal(format!("corrupt session.ping for {serial}")))?;
                Ok(Some(Session { user, start, ping }))
            }
            _ => Ok(None),
        }
    }

    /// `zrem unlocked[C] s; set lock.user=user; set lock.time=t` (spec §4.2).
    /// No atomicity across the three steps is required: the caller already
    /// holds `locking[C]`.
    pub async fn lock_board(&self, serial: &str, class: &str, user: &str, t: u64) -> Result<(), VlabError> {
        self.store.zrem(&keys::class_unlocked(class), serial).await?;
        self.store.set(&keys::board_lock_user(serial), user).await?;
        self.store.set(&keys::board_lock_time(serial), &t.to_string()).await?;
        tracing::debug!(serial, class, user, "lock_board");
        Ok(())
    }

    /// `del lock.user; del lock.time; zadd unlocked[C] <- now s`. Always
    /// succeeds (spec §4.2 "Returns true").
    pub async fn unlock_board(&self, serial: &str, class: &str) -> Result<bool, VlabError> {
        self.store.del(&keys::board_lock_user(serial)).await?;
        self.store.del(&keys::board_lock_time(serial)).await?;
        self.store.zadd(&keys::class_unlocked(class), serial, now_epoch() as f64).await?;
        tracing::debug!(serial, class, "unlock_board");
        Ok(true)
    }

    /// Only unlock if the current lock is held by `user`; a stale releaser
    /// whose lease has already been taken over is a no-op, not an error.
    pub async fn unlock_board_if_user(&self, serial: &str, class: &str, user: &str) -> Result<bool, VlabError> {
        match self.read_lock(serial).await? {
            Some(lock) if lock.user == user => self.unlock_board(serial, class).await,
            _ => Ok(false),
        }
    }

    /// As [`Self::unlock_board_if_user`], additionally requiring the lock
    /// was taken at exactly `guard.time` — so a slow teardown that races a
    /// preemption can never clobber the new owner's fresh lock.
    pub async fn unlock_board_if_user_and_time(
        &self,
        serial: &str,
        class: &str,
        guard: &Guard,
    ) -> Result<bool, VlabError> {
        match self.read_lock(serial).await? {
            Some(lock) if lock.user == guard.user && lock.time == guard.time => {
                self.unlock_board(serial, class).await
            }
            _ => Ok(false),
        }
    }

    /// `lockBoard + zrem available[C] s + set session.{user,start,ping}=t`.
    pub async fn start_session(&self, serial: &str, class: &str, user: &str, t: u64) -> Result<(), VlabError> {
        self.lock_board(serial, class, user, t).await?;
        self.store.zrem(&keys::class_available(class), serial).await?;
        self.store.set(&keys::board_session_user(serial), user).await?;
        self.store.set(&keys::board_session_start(serial), &t.to_string()).await?;
        self.store.set(&keys::board_session_ping(serial), &t.to_string()).await?;
        tracing::info!(serial, class, user, "start_session");
        Ok(())
    }

    /// `del session.{user,start,ping}; zadd available[C] <- now s`. Does
    /// NOT implicitly unlock — the unlock may already have happened via
    /// expiry, and ending a session must not undo an unrelated unlock.
    pub async fn end_session(&self, serial: &str, class: &str) -> Result<bool, VlabError> {
        self.store.del(&keys::board_session_user(serial)).await?;
        self.store.del(&keys::board_session_start(serial)).await?;
        self.store.del(&keys::board_session_ping(serial)).await?;
        self.store.zadd(&keys::class_available(class), serial, now_epoch() as f64).await?;
        tracing::info!(serial, class, "end_session");
        Ok(true)
    }

    pub async fn end_session_if_user(&self, serial: &str, class: &str, user: &str) -> Result<bool, VlabError> {
        match self.read_session(serial).await? {
            Some(session) if session.user == user => self.end_session(serial, class).await,
            _ => Ok(false),
        }
    }

    /// `guard.time` is matched against `session.start`, identifying the
    /// specific session instance rather than just its owning user.
    pub async fn end_session_if_user_and_time(
        &self,
        serial: &str,
        class: &str,
        guard: &Guard,
    ) -> Result<bool, VlabError> {
        match self.read_session(serial).await? {
            Some(session) if session.user == guard.user && session.start == guard.time => {
                self.end_session(serial, class).await
            }
            _ => Ok(false),
        }
    }

    /// `set session.ping = now`.
    pub async fn ping_session(&self, serial: &str) -> Result<(), VlabError> {
        self.store.set(&keys::board_session_ping(serial), &now_epoch().to_string()).await
    }

    /// Used by C4's keep-alive loop: returns `false` iff another user's
    /// session has taken over, in which case the caller must terminate.
    pub async fn ping_session_if_user_and_time(&self, serial: &str, guard: &Guard) -> Result<bool, VlabError> {
        match self.read_session(serial).await? {
            Some(session) if session.user == guard.user && session.start == guard.time => {
                self.ping_session(serial).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Pop the lowest-scored (longest-idle) member of `available[C]`.
    pub async fn allocate_available(&self, class: &str) -> Result<Option<String>, VlabError> {
        let popped = self.store.zpop_min(&keys::class_available(class)).await?;
        Ok(popped.map(|(serial, _score)| serial))
    }

    /// Pop the lowest-scored member of `unlocked[C]` (an in-use board whose
    /// lease has expired; its previous session may still be winding down).
    pub async fn allocate_unlocked(&self, class: &str) -> Result<Option<String>, VlabError> {
        let popped = self.store.zpop_min(&keys::class_unlocked(class)).await?;
        Ok(popped.map(|(serial, _score)| serial))
    }

    /// Find `serial`'s class by scanning `boardclasses`, then remove it from
    /// all three per-class sets and delete every instance key.
    pub async fn remove_board(&self, serial: &str) -> Result<(), VlabError> {
        let classes = self.store.smembers(keys::BOARDCLASSES).await?;
        for class in classes {
            if self.store.sismember(&keys::class_boards(class.as_str()), serial).await? {
                self.store.srem(&keys::class_boards(&class), serial).await?;
                self.store.zrem(&keys::class_available(&class), serial).await?;
                self.store.zrem(&keys::class_unlocked(&class), serial).await?;
                break;
            }
        }
        for key in keys::board_instance_keys(serial) {
            self.store.del(&key).await?;
        }
        tracing::info!(serial, "remove_board");
        Ok(())
    }

    /// Sweep every class for boards locked by `user`, releasing each one.
    /// Returns the serials that were unlocked.
    pub async fn unlock_boards_held_by(&self, user: &str) -> Result<Vec<String>, VlabError> {
        let mut released = Vec::new();
        let classes = self.store.smembers(keys::BOARDCLASSES).await?;
        for class in classes {
            let serials = self.store.smembers(&keys::class_boards(&class)).await?;
            for serial in serials {
                if self.unlock_board_if_user(&serial, &class, user).await? {
                    released.push(serial);
                }
            }
        }
        Ok(released)
    }

    /// Advisory coarse-serialization token around class-wide allocation
    /// (spec §4.4). Not a mutual-exclusion lock — its only reader is the
    /// sweeper, which skips a class while the token is live.
    pub async fn set_locking_token(&self, class: &str, ttl: std::time::Duration) -> Result<(), VlabError> {
        self.store.setex(&keys::class_locking(class), "1", ttl).await
    }

    /// C3 `attach(serial)`: record server/port and join all three per-class
    /// pools at `now`. Idempotent — a duplicate udev event re-adds the same
    /// serial at a fresh score, which is harmless (design note §9).
    pub async fn attach_board(&self, serial: &str, class: &str, server: &str, port: u16) -> Result<(), VlabError> {
        self.store.sadd(keys::BOARDCLASSES, class).await?;
        self.store.sadd(&keys::class_boards(class), serial).await?;
        self.store.set(&keys::board_server(serial), server).await?;
        self.store.set(&keys::board_port(serial), &port.to_string()).await?;
        let t = now_epoch() as f64;
        self.store.zadd(&keys::class_available(class), serial, t).await?;
        self.store.zadd(&keys::class_unlocked(class), serial, t).await?;
        tracing::info!(serial, class, server, port, "attach_board");
        Ok(())
    }

    /// C3 `detach(serial)`: leave no instance keys and no set membership.
    /// Idempotent — removing an absent member from a set or an absent key
    /// is a no-op.
    pub async fn detach_board(&self, serial: &str, class: &str) -> Result<(), VlabError> {
        self.store.srem(&keys::class_boards(class), serial).await?;
        self.store.zrem(&keys::class_available(class), serial).await?;
        self.store.zrem(&keys::class_unlocked(class), serial).await?;
        for key in keys::board_instance_keys(serial) {
            self.store.del(&key).await?;
        }
        tracing::info!(serial, class, "detach_board");
        Ok(())
    }

    /// C3 `reassert`: re-publish `server`/`port` only. Must NOT touch
    /// `available[C]`/`unlocked[C]` — those pools are owned by attach/detach
    /// and the relay's release paths (spec §4.3 point 4, design note §9).
    pub async fn reassert_board(&self, serial: &str, server: &str, port: u16) -> Result<(), VlabError> {
        self.store.set(&keys::board_server(serial), server).await?;
        self.store.set(&keys::board_port(serial), &port.to_string()).await?;
        Ok(())
    }

    /// `incr(port-counter)` folded into `[lo, hi)`, wrapping back to `lo`
    /// past `hi` (spec §4.4 `getport`). The counter is seeded one below
    /// `lo` via `setnx` so the very first call returns exactly `lo`.
    pub async fn next_port(&self, lo: u16, hi: u16) -> Result<u16, VlabError> {
        self.store.setnx(keys::PORTCOUNTER, &(lo as i64 - 1).to_string()).await?;
        let n = self.store.incr(keys::PORTCOUNTER).await?;
        let span = (hi - lo) as i64;
        let offset = (n - lo as i64).rem_euclid(span);
        Ok(lo + offset as u16)
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
