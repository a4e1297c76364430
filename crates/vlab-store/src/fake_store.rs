// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`Store`] for unit tests (mirrors the teacher's `test_support`
//! mock pattern: a single `parking_lot::Mutex`-guarded state struct behind
//! the real trait, no network, deterministic ordering).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::VlabError;
use crate::store::Store;

#[derive(Default)]
struct Inner {
    strings: HashMap<String, String>,
    sets: HashMap<String, HashSet<String>>,
    /// member -> score, kept sorted by score then member for deterministic iteration.
    zsets: HashMap<String, BTreeMap<(OrderedScore, String), ()>>,
}

/// A thin newtype so `f64` scores can live inside a `BTreeMap` key; total
/// ordering is fine here since nothing in this system produces NaN scores.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct OrderedScore(f64);

impl Eq for OrderedScore {}
impl Ord for OrderedScore {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// In-memory, fully synchronous (internally) [`Store`], suitable for unit
/// tests of `lease.rs` and the janitors without a live Redis.
#[derive(Default)]
pub struct FakeStore {
    inner: Mutex<Inner>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn get(&self, key: &str) -> Result<Option<String>, VlabError> {
        Ok(self.inner.lock().strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), VlabError> {
        self.inner.lock().strings.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn setnx(&self, key: &str, value: &str) -> Result<bool, VlabError> {
        let mut inner = self.inner.lock();
        if inner.strings.contains_key(key) {
            Ok(false)
        } else {
            inner.strings.insert(key.to_owned(), value.to_owned());
            Ok(true)
        }
    }

    async fn setex(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), VlabError> {
        // Expiry is not modeled; tests assert on presence/absence directly
        // rather than waiting out a TTL.
        self.set(key, value).await
    }

    async fn del(&self, key: &str) -> Result<bool, VlabError> {
        let mut inner = self.inner.lock();
        Ok(inner.strings.remove(key).is_some())
    }

    async fn incr(&self, key: &str) -> Result<i64, VlabError> {
        let mut inner = self.inner.lock();
        let entry = inner.strings.entry(key.to_owned()).or_insert_with(|| "0".to_owned());
        let n: i64 = entry.parse().map_err(|_| VlabError::Internal(format!("{key} is not an integer")))?;
        let n = n + 1;
        *entry = n.to_string();
        Ok(n)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, VlabError> {
        let mut inner = self.inner.lock();
        Ok(inner.sets.entry(key.to_owned()).or_default().insert(member.to_owned()))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, VlabError> {
        let mut inner = self.inner.lock();
        Ok(inner.sets.entry(key.to_owned()).or_default().remove(member))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, VlabError> {
        let inner = self.inner.lock();
        let mut v: Vec<String> = inner.sets.get(key).cloned().unwrap_or_default().into_iter().collect();
        v.sort();
        Ok(v)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, VlabError> {
        let inner = self.inner.lock();
        Ok(inner.sets.get(key).is_some_and(|s| s.contains(member)))
    }

    async fn scard(&self, key: &str) -> Result<usize, VlabError> {
        let inner = self.inner.lock();
        Ok(inner.sets.get(key).map(|s| s.len()).unwrap_or(0))
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), VlabError> {
        let mut inner = self.inner.lock();
        let zset = inner.zsets.entry(key.to_owned()).or_default();
        zset.retain(|(_, m), ()| m != member);
        zset.insert((OrderedScore(score), member.to_owned()), ());
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, VlabError> {
        let mut inner = self.inner.lock();
        let zset = inner.zsets.entry(key.to_owned()).or_default();
        let before = zset.len();
        zset.retain(|(_, m), ()| m != member);
        Ok(zset.len() != before)
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, VlabError> {
        let inner = self.inner.lock();
        Ok(inner
            .zsets
            .get(key)
            .and_then(|z| z.keys().find(|(_, m)| m == member).map(|(s, _)| s.0)))
    }

    async fn zcard(&self, key: &str) -> Result<usize, VlabError> {
        let inner = self.inner.lock();
        Ok(inner.zsets.get(key).map(|z| z.len()).unwrap_or(0))
    }

    async fn zrange(&self, key: &str) -> Result<Vec<(String, f64)>, VlabError> {
        let inner = self.inner.lock();
        Ok(inner
            .zsets
            .get(key)
            .map(|z| z.keys().map(|(s, m)| (m.clone(), s.0)).collect())
            .unwrap_or_default())
    }

    async fn zpop_min(&self, key: &str) -> Result<Option<(String, f64)>, VlabError> {
        let mut inner = self.inner.lock();
        let zset = inner.zsets.entry(key.to_owned()).or_default();
        let Some((score, member)) = zset.keys().next().cloned() else {
            return Ok(None);
        };
        zset.remove(&(score, member.clone()));
        Ok(Some((member, score.0)))
    }
}

#[cfg(test)]
#[path = "fake_store_tests.rs"]
mod tests;
