// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! These tests only run against a real Redis reachable via `REDIS_URL`; they
//! no-op (with a log line) otherwise, matching the `tests/specs` crate's
//! convention of not requiring infra for the default test run.

use super::*;
use std::time::Duration;

async fn connect_or_skip() -> Option<RedisStore> {
    let url = match std::env::var("REDIS_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("skipping redis_store test: REDIS_URL not set");
            return None;
        }
    };
    let config = RedisConfig { url, connect_attempts: 2, connect_interval: Duration::from_millis(50) };
    RedisStore::connect(&config).await.ok()
}

#[tokio::test]
async fn string_roundtrip() {
    let Some(store) = connect_or_skip().await else { return };
    let key = "vlabstore:test:string_roundtrip";
    store.set(key, "hello").await.unwrap();
    assert_eq!(store.get(key).await.unwrap(), Some("hello".to_owned()));
    store.del(key).await.unwrap();
    assert_eq!(store.get(key).await.unwrap(), None);
}

#[tokio::test]
async fn setnx_only_sets_once() {
    let Some(store) = connect_or_skip().await else { return };
    let key = "vlabstore:test:setnx";
    store.del(key).await.unwrap();
    assert!(store.setnx(key, "a").await.unwrap());
    assert!(!store.setnx(key, "b").await.unwrap());
    assert_eq!(store.get(key).await.unwrap(), Some("a".to_owned()));
    store.del(key).await.unwrap();
}

#[tokio::test]
async fn zpop_min_pops_lowest_score() {
    let Some(store) = connect_or_skip().await else { return };
    let key = "vlabstore:test:zpop_min";
    store.del(key).await.unwrap();
    store.zadd(key, "b", 20.0).await.unwrap();
    store.zadd(key, "a", 10.0).await.unwrap();
    let popped = store.zpop_min(key).await.unwrap();
    assert_eq!(popped, Some(("a".to_owned(), 10.0)));
    assert_eq!(store.zcard(key).await.unwrap(), 1);
    store.del(key).await.unwrap();
}

#[tokio::test]
async fn zpop_min_on_empty_set_returns_none() {
    let Some(store) = connect_or_skip().await else { return };
    let key = "vlabstore:test:zpop_min_empty";
    store.del(key).await.unwrap();
    assert_eq!(store.zpop_min(key).await.unwrap(), None);
}
