// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the observability API (C6, spec §4.6).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use vlabstore::keys;

use crate::error::ApiError;
use crate::observability::{board_views, summarize};
use crate::state::VlabdState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub board_count: usize,
}

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<VlabdState>>) -> Result<impl IntoResponse, ApiError> {
    let views = board_views(&s).await?;
    Ok(Json(HealthResponse { status: "running".to_owned(), board_count: views.len() }))
}

/// `GET /api/v1/boards`
pub async fn boards(State(s): State<Arc<VlabdState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(board_views(&s).await?))
}

/// `GET /api/v1/stats/summary`
pub async fn stats_summary(State(s): State<Arc<VlabdState>>) -> Result<impl IntoResponse, ApiError> {
    let views = board_views(&s).await?;
    Ok(Json(summarize(&views)))
}

/// `GET /api/v1/stats/hourly`
pub async fn stats_hourly(State(s): State<Arc<VlabdState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = s.access_log.stats()?;
    Ok(Json(stats.lock_counts_by_hour.clone()))
}

/// `GET /api/v1/stats/users`
pub async fn stats_users(State(s): State<Arc<VlabdState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = s.access_log.stats()?;
    Ok(Json(stats.lock_counts_by_user.clone()))
}

/// `GET /api/v1/stats/denials`
pub async fn stats_denials(State(s): State<Arc<VlabdState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = s.access_log.stats()?;
    Ok(Json(stats.denials_by_user.clone()))
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// `POST /api/v1/config/reload` — `setex config.reload 120s = "1"` (spec §4.6).
pub async fn config_reload(State(s): State<Arc<VlabdState>>) -> Result<impl IntoResponse, ApiError> {
    s.store.setex(keys::CONFIG_RELOAD, "1", Duration::from_secs(120)).await?;
    tracing::info!("config reload requested via observability API");
    Ok(Json(AckResponse { ok: true }))
}

/// `POST /api/v1/hwtest/trigger` — `setex hwtest.trigger 300s = "1"` unless a
/// run is already in flight (spec §4.6).
pub async fn hwtest_trigger(State(s): State<Arc<VlabdState>>) -> Result<impl IntoResponse, ApiError> {
    if s.store.get(keys::HWTEST_RUNNING).await?.is_some() {
        return Ok(Json(AckResponse { ok: false }));
    }
    s.store.setex(keys::HWTEST_TRIGGER, "1", Duration::from_secs(300)).await?;
    tracing::info!("hardware self-test triggered via observability API");
    Ok(Json(AckResponse { ok: true }))
}
