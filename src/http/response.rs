//! Mapping of core outcomes to HTTP responses.
//!
//! # Design Decisions
//! - Accepted admissions are 200; rejections are 503 with a reason
//! - Core errors never leak internals beyond their display string

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::admission::Admission;
use crate::error::CoordError;

impl IntoResponse for Admission {
    fn into_response(self) -> Response {
        match self {
            Admission::Accepted {
                id,
                excess,
                overloaded,
            } => (
                StatusCode::OK,
                Json(json!({ "id": id, "excess": excess, "overloaded": overloaded })),
            )
                .into_response(),
            Admission::Rejected(reason) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "reason": reason })),
            )
                .into_response(),
        }
    }
}

/// Error wrapper for handlers.
#[derive(Debug)]
pub struct ApiError(pub CoordError);

impl From<CoordError> for ApiError {
    fn from(err: CoordError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}
