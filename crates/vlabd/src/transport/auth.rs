// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use vlabstore::VlabError;

use crate::error::ApiError;
use crate::state::VlabdState;

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), VlabError> {
    let Some(expected) = expected else { return Ok(()) };
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| VlabError::Unauthorized("missing authorization header".to_owned()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| VlabError::Unauthorized("malformed authorization header".to_owned()))?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(VlabError::Unauthorized("invalid bearer token".to_owned()))
    }
}

/// Axum middleware enforcing Bearer token auth on every route except
/// `/api/v1/health`.
pub async fn auth_layer(
    state: State<Arc<VlabdState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if req.uri().path() == "/api/v1/health" {
        return next.run(req).await;
    }
    if let Err(e) = validate_bearer(req.headers(), state.config.auth_token.as_deref()) {
        return ApiError(e).into_response();
    }
    next.run(req).await
}
