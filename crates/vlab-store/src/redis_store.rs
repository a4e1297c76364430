// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed [`Store`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::error::VlabError;
use crate::store::{connect_with_retry, Store};

/// Redis connection parameters (clap-parsed by the daemon/cli crates;
/// constructed directly by tests).
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// Number of connection attempts at startup before giving up.
    pub connect_attempts: u32,
    /// Delay between connection attempts.
    pub connect_interval: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_owned(),
            connect_attempts: 5,
            connect_interval: Duration::from_secs(2),
        }
    }
}

/// [`Store`] implementation backed by a real Redis instance.
pub struct RedisStore {
    manager: redis::aio::ConnectionManager,
}

impl RedisStore {
    /// Connect, blocking-and-retrying up to `config.connect_attempts` times
    /// (spec §4.1 "connection helper must block-and-retry... while the
    /// store is coming up").
    pub async fn connect(config: &RedisConfig) -> Result<Self, VlabError> {
        let url = config.url.clone();
        let manager = connect_with_retry(config.connect_attempts, config.connect_interval, || {
            let url = url.clone();
            async move {
                let client = redis::Client::open(url.as_str())
                    .map_err(|e| VlabError::Internal(format!("invalid redis url: {e}")))?;
                client
                    .get_connection_manager()
                    .await
                    .map_err(|_| VlabError::StoreUnavailable)
            }
        })
        .await?;
        Ok(Self { manager })
    }

    fn conn(&self) -> redis::aio::ConnectionManager {
        self.manager.clone()
    }
}

fn unavailable<E: std::fmt::Display>(e: E) -> VlabError {
    tracing::debug!(err = %e, "redis transport error");
    VlabError::StoreUnavailable
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, VlabError> {
        self.conn().get(key).await.map_err(unavailable)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), VlabError> {
        self.conn().set(key, value).await.map_err(unavailable)
    }

    async fn setnx(&self, key: &str, value: &str) -> Result<bool, VlabError> {
        self.conn().set_nx(key, value).await.map_err(unavailable)
    }

    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), VlabError> {
        self.conn()
            .set_ex(key, value, ttl.as_secs().max(1))
            .await
            .map_err(unavailable)
    }

    async fn del(&self, key: &str) -> Result<bool, VlabError> {
        let n: i64 = self.conn().del(key).await.map_err(unavailable)?;
        Ok(n > 0)
    }

    async fn incr(&self, key: &str) -> Result<i64, VlabError> {
        self.conn().incr(key, 1).await.map_err(unavailable)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, VlabError> {
        let n: i64 = self.conn().sadd(key, member).await.map_err(unavailable)?;
        Ok(n > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, VlabError> {
        let n: i64 = self.conn().srem(key, member).await.map_err(unavailable)?;
        Ok(n > 0)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, VlabError> {
        self.conn().smembers(key).await.map_err(unavailable)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, VlabError> {
        self.conn().sismember(key, member).await.map_err(unavailable)
    }

    async fn scard(&self, key: &str) -> Result<usize, VlabError> {
        self.conn().scard(key).await.map_err(unavailable)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), VlabError> {
        let _: i64 = self.conn().zadd(key, member, score).await.map_err(unavailable)?;
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, VlabError> {
        let n: i64 = self.conn().zrem(key, member).await.map_err(unavailable)?;
        Ok(n > 0)
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, VlabError> {
        self.conn().zscore(key, member).await.map_err(unavailable)
    }

    async fn zcard(&self, key: &str) -> Result<usize, VlabError> {
        self.conn().zcard(key).await.map_err(unavailable)
    }

    async fn zrange(&self, key: &str) -> Result<Vec<(String, f64)>, VlabError> {
        self.conn().zrange_withscores(key, 0, -1).await.map_err(unavailable)
    }

    async fn zpop_min(&self, key: &str) -> Result<Option<(String, f64)>, VlabError> {
        // watch -> read lowest -> multi(zrem) -> exec, retried on conflict
        // (spec §4.2 "Algorithmic notes", §5 "Ordering and atomicity").
        const MAX_RETRIES: u32 = 10;
        let mut conn = self.conn();

        for _ in 0..MAX_RETRIES {
            let () = redis::cmd("WATCH").arg(key).query_async(&mut conn).await.map_err(unavailable)?;

            let lowest: Vec<(String, f64)> =
                conn.zrange_withscores(key, 0, 0).await.map_err(unavailable)?;
            let Some((member, score)) = lowest.into_iter().next() else {
                let () = redis::cmd("UNWATCH").query_async(&mut conn).await.map_err(unavailable)?;
                return Ok(None);
            };

            let mut pipe = redis::pipe();
            pipe.atomic().zrem(key, &member);
            let result: Option<(i64,)> = pipe.query_async(&mut conn).await.map_err(unavailable)?;

            match result {
                Some(_) => return Ok(Some((member, score))),
                None => continue, // watched key changed concurrently; retry
            }
        }

        Err(VlabError::Conflict)
    }
}

#[cfg(test)]
#[path = "redis_store_tests.rs"]
mod tests;
