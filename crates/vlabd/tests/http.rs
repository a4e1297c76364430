// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the observability API (C6).
//!
//! Uses `axum_test::TestServer` — no real TCP needed.

use std::sync::Arc;

use axum_test::TestServer;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use vlabstore::fake_store::FakeStore;
use vlabstore::Store;

use vlabd::config::VlabdConfig;
use vlabd::state::VlabdState;
use vlabd::transport::build_router;

fn test_config(access_log_path: &std::path::Path) -> VlabdConfig {
    VlabdConfig::parse_from([
        "vlabd",
        "--config-path",
        "/tmp/vlab-config.json",
        "--access-log-path",
        &access_log_path.display().to_string(),
    ])
}

fn test_server(store: Arc<FakeStore>, access_log_path: &std::path::Path) -> TestServer {
    let config = test_config(access_log_path);
    let state = Arc::new(VlabdState::new(store, config, CancellationToken::new()));
    TestServer::new(build_router(state)).expect("failed to create test server")
}

async fn seeded_store() -> Arc<FakeStore> {
    let store = Arc::new(FakeStore::default());
    store.sadd("vlab:boardclasses", "fpga-a").await.unwrap();
    store.sadd("vlab:boardclass:fpga-a:boards", "s1").await.unwrap();
    store.set("vlab:board:s1:type", "xilinx-zcu102").await.unwrap();
    store.zadd("vlab:boardclass:fpga-a:available", "s1", 1.0).await.unwrap();
    store.zadd("vlab:boardclass:fpga-a:unlocked", "s1", 1.0).await.unwrap();
    store
}

#[tokio::test]
async fn boards_reports_the_seeded_board_as_available() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(seeded_store().await, &dir.path().join("access.log"));

    let resp = server.get("/api/v1/boards").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    let boards = body.as_array().unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0]["serial"], "s1");
    assert_eq!(boards[0]["status"], "available");
}

#[tokio::test]
async fn stats_summary_counts_the_seeded_board() {
    let dir = tempfile::tempdir().unwrap();
    let access_log_path = dir.path().join("access.log");
    std::fs::write(&access_log_path, "").unwrap();
    let server = test_server(seeded_store().await, &access_log_path);

    let resp = server.get("/api/v1/stats/summary").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    let fpga_a = body.as_array().unwrap().iter().find(|c| c["class"] == "fpga-a").unwrap();
    assert_eq!(fpga_a["total"], 1);
    assert_eq!(fpga_a["available"], 1);
}

#[tokio::test]
async fn config_reload_sets_the_reload_flag() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FakeStore::default());
    let server = test_server(Arc::clone(&store), &dir.path().join("access.log"));

    let resp = server.post("/api/v1/config/reload").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["ok"], true);
    assert!(store.get("vlab:config:reload").await.unwrap().is_some());
}

#[tokio::test]
async fn hwtest_trigger_is_refused_while_a_run_is_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FakeStore::default());
    store.set("vlab:hwtest:running", "1").await.unwrap();
    let server = test_server(Arc::clone(&store), &dir.path().join("access.log"));

    let resp = server.post("/api/v1/hwtest/trigger").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["ok"], false);
}
