// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `vlabd` binary and exercise
//! its observability API over HTTP.

use std::time::Duration;

use vlab_specs::VlabdProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

macro_rules! require_redis {
    () => {
        if !vlab_specs::redis_reachable() {
            eprintln!("skipping: no Redis reachable at VLAB_SPEC_REDIS_URL");
            return Ok(());
        }
    };
}

#[tokio::test]
async fn health_reports_running_and_board_count() -> anyhow::Result<()> {
    require_redis!();
    let vlabd = VlabdProcess::start()?;
    vlabd.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/v1/health", vlabd.base_url())).await?.json().await?;

    assert_eq!(resp["status"], "running");
    assert!(resp["board_count"].is_number());

    Ok(())
}

#[tokio::test]
async fn boards_lists_the_configured_known_board_after_reload() -> anyhow::Result<()> {
    require_redis!();
    let vlabd = VlabdProcess::start()?;
    vlabd.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    client.post(format!("{}/api/v1/config/reload", vlabd.base_url())).send().await?;

    // The reload janitor polls every 5s, so give it room to pick up the flag.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    loop {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("board B1 never appeared after a config reload");
        }
        let resp: serde_json::Value =
            client.get(format!("{}/api/v1/boards", vlabd.base_url())).send().await?.json().await?;
        let boards = resp.as_array().ok_or_else(|| anyhow::anyhow!("expected a JSON array"))?;
        if boards.iter().any(|b| b["serial"] == "B1") {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[tokio::test]
async fn stats_summary_responds_before_any_activity() -> anyhow::Result<()> {
    require_redis!();
    let vlabd = VlabdProcess::start()?;
    vlabd.wait_healthy(TIMEOUT).await?;

    let resp = reqwest::get(format!("{}/api/v1/stats/summary", vlabd.base_url())).await?;
    assert!(resp.status().is_success());

    Ok(())
}

#[tokio::test]
async fn config_reload_is_accepted() -> anyhow::Result<()> {
    require_redis!();
    let vlabd = VlabdProcess::start()?;
    vlabd.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/v1/config/reload", vlabd.base_url()))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(resp["ok"], true);

    Ok(())
}
