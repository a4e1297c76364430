// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn string_roundtrip() {
    let store = FakeStore::new();
    assert_eq!(store.get("k").await.unwrap(), None);
    store.set("k", "v").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some("v".to_owned()));
    assert!(store.del("k").await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn setnx_only_sets_once() {
    let store = FakeStore::new();
    assert!(store.setnx("k", "a").await.unwrap());
    assert!(!store.setnx("k", "b").await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), Some("a".to_owned()));
}

#[tokio::test]
async fn incr_starts_at_zero_and_is_stable_as_string() {
    let store = FakeStore::new();
    assert_eq!(store.incr("counter").await.unwrap(), 1);
    assert_eq!(store.incr("counter").await.unwrap(), 2);
}

#[tokio::test]
async fn set_operations() {
    let store = FakeStore::new();
    assert!(store.sadd("s", "a").await.unwrap());
    assert!(!store.sadd("s", "a").await.unwrap());
    assert!(store.sadd("s", "b").await.unwrap());
    assert_eq!(store.scard("s").await.unwrap(), 2);
    assert!(store.sismember("s", "a").await.unwrap());
    assert!(store.srem("s", "a").await.unwrap());
    assert!(!store.sismember("s", "a").await.unwrap());
    assert_eq!(store.smembers("s").await.unwrap(), vec!["b".to_owned()]);
}

#[tokio::test]
async fn zadd_reinserting_a_member_updates_its_score() {
    let store = FakeStore::new();
    store.zadd("z", "a", 5.0).await.unwrap();
    store.zadd("z", "a", 1.0).await.unwrap();
    assert_eq!(store.zcard("z").await.unwrap(), 1);
    assert_eq!(store.zscore("z", "a").await.unwrap(), Some(1.0));
}

#[tokio::test]
async fn zrange_is_ascending_by_score() {
    let store = FakeStore::new();
    store.zadd("z", "b", 20.0).await.unwrap();
    store.zadd("z", "a", 10.0).await.unwrap();
    store.zadd("z", "c", 30.0).await.unwrap();
    let range = store.zrange("z").await.unwrap();
    assert_eq!(range, vec![("a".to_owned(), 10.0), ("b".to_owned(), 20.0), ("c".to_owned(), 30.0)]);
}

#[tokio::test]
async fn zpop_min_pops_lowest_score_and_removes_it() {
    let store = FakeStore::new();
    store.zadd("z", "b", 20.0).await.unwrap();
    store.zadd("z", "a", 10.0).await.unwrap();
    assert_eq!(store.zpop_min("z").await.unwrap(), Some(("a".to_owned(), 10.0)));
    assert_eq!(store.zcard("z").await.unwrap(), 1);
    assert_eq!(store.zpop_min("z").await.unwrap(), Some(("b".to_owned(), 20.0)));
    assert_eq!(store.zpop_min("z").await.unwrap(), None);
}
