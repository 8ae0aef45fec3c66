//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::HandlerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Command handling failed.
    Handler(HandlerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Handler(err) => (handler_status(&err), err.kind(), err.to_string()),
        };

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

fn handler_status(err: &HandlerError) -> StatusCode {
    match err {
        HandlerError::UnknownCommand { .. } => StatusCode::BAD_REQUEST,
        HandlerError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        HandlerError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
        HandlerError::LogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        // Already logged by the handler when replay detected it.
        HandlerError::CorruptHistory { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        HandlerError::Serialization(_) => {
            tracing::error!(error = %err, "failed to encode event");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<HandlerError> for ApiError {
    fn from(err: HandlerError) -> Self {
        ApiError::Handler(err)
    }
}
