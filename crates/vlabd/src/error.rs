// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use vlabstore::VlabError;

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Newtype so the observability API can `impl IntoResponse` for the shared
/// `vlabstore` error type without an orphan-rule violation.
pub struct ApiError(pub VlabError);

impl From<VlabError> for ApiError {
    fn from(e: VlabError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: ErrorBody { code: self.0.as_str().to_owned(), message: self.0.to_string() },
        };
        (status, Json(body)).into_response()
    }
}
