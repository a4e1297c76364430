// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control store capability (C1) — strings with TTL/setnx, sets, sorted
//! sets, and the one atomic primitive the whole system needs: popping the
//! lowest-scored member of a sorted set.
//!
//! Re-architected from the source's ambient global connection (design note
//! §9 in SPEC_FULL.md) into an explicit, injectable [`Store`] trait so every
//! component takes `Arc<dyn Store>` instead of reaching for a global.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::VlabError;

/// A key/value service supporting strings, sets, sorted sets, and one
/// atomic compound operation (spec §4.1).
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, VlabError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), VlabError>;
    /// Set iff the key does not already exist. Returns whether it was set.
    async fn setnx(&self, key: &str, value: &str) -> Result<bool, VlabError>;
    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), VlabError>;
    /// Returns whether the key existed.
    async fn del(&self, key: &str) -> Result<bool, VlabError>;
    async fn incr(&self, key: &str) -> Result<i64, VlabError>;

    /// Returns whether the member was newly added.
    async fn sadd(&self, key: &str, member: &str) -> Result<bool, VlabError>;
    /// Returns whether the member was present.
    async fn srem(&self, key: &str, member: &str) -> Result<bool, VlabError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, VlabError>;
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, VlabError>;
    async fn scard(&self, key: &str) -> Result<usize, VlabError>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), VlabError>;
    /// Returns whether the member was present.
    async fn zrem(&self, key: &str, member: &str) -> Result<bool, VlabError>;
    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, VlabError>;
    async fn zcard(&self, key: &str) -> Result<usize, VlabError>;
    /// All members in ascending score order.
    async fn zrange(&self, key: &str) -> Result<Vec<(String, f64)>, VlabError>;

    /// Atomically pop the lowest-scored member of a sorted set: `watch key,
    /// read the lowest member, multi(zrem), exec`, retrying on conflict
    /// (spec §5 "Ordering and atomicity" — the only operation that needs
    /// true atomicity). Returns `None` if the set was empty.
    async fn zpop_min(&self, key: &str) -> Result<Option<(String, f64)>, VlabError>;
}

/// Block-and-retry helper for store construction (spec §7 `StoreUnavailable`):
/// up to `attempts` tries, `interval` apart, before giving up.
pub async fn connect_with_retry<F, Fut, T>(
    attempts: u32,
    interval: Duration,
    mut connect: F,
) -> Result<T, VlabError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, VlabError>>,
{
    let mut last_err = VlabError::StoreUnavailable;
    for attempt in 0..attempts {
        match connect().await {
            Ok(t) => return Ok(t),
            Err(e) => {
                tracing::warn!(attempt, err = %e, "control store connection attempt failed");
                last_err = e;
                if attempt + 1 < attempts {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
    tracing::error!(err = %last_err, "control store unreachable after retry budget exhausted");
    Err(VlabError::StoreUnavailable)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
