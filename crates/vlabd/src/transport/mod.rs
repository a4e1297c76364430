// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observability API router assembly (C6).

pub mod auth;
pub mod http;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::VlabdState;

pub fn build_router(state: Arc<VlabdState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::health))
        .route("/api/v1/boards", get(http::boards))
        .route("/api/v1/stats/summary", get(http::stats_summary))
        .route("/api/v1/stats/hourly", get(http::stats_hourly))
        .route("/api/v1/stats/users", get(http::stats_users))
        .route("/api/v1/stats/denials", get(http::stats_denials))
        .route("/api/v1/config/reload", post(http::config_reload))
        .route("/api/v1/hwtest/trigger", post(http::hwtest_trigger))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;
    use vlabstore::fake_store::FakeStore;

    use super::*;
    use crate::config::VlabdConfig;
    use clap::Parser;

    fn state(auth_token: Option<&str>) -> Arc<VlabdState> {
        let mut config = VlabdConfig::parse_from([
            "vlabd",
            "--config-path",
            "/tmp/vlab-config.json",
            "--access-log-path",
            "/tmp/vlab-access.log",
        ]);
        config.auth_token = auth_token.map(str::to_owned);
        Arc::new(VlabdState::new(Arc::new(FakeStore::default()), config, CancellationToken::new()))
    }

    #[tokio::test]
    async fn health_is_reachable_without_a_token() {
        let router = build_router(state(Some("secret")));
        let resp = router
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn boards_requires_a_token_when_configured() {
        let router = build_router(state(Some("secret")));
        let resp = router
            .oneshot(Request::builder().uri("/api/v1/boards").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn boards_is_reachable_with_no_token_configured() {
        let router = build_router(state(None));
        let resp = router
            .oneshot(Request::builder().uri("/api/v1/boards").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
