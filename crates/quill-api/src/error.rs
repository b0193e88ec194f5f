use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// HTTP-facing error taxonomy. Store-layer faults arrive as `Internal` and
/// are logged server-side; clients only ever see the generic 500 body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    /// Login failure; the body is identical for unknown users and wrong
    /// passwords so the two cases cannot be told apart.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": "Invalid credentials" }),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": "Authentication required" }),
            ),
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, json!({ "error": format!("{what} not found") }))
            }
            ApiError::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            ApiError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
