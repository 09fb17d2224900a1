//! HTTP error mapping.

use axum::{http::StatusCode, response::IntoResponse, Json};

/// Errors a handler can surface to the client.
///
/// Authentication failures always render the same generic message so a
/// caller cannot distinguish an unknown user from wrong credentials.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Internal(String),
}

impl From<tasksync_core::Error> for ApiError {
    fn from(err: tasksync_core::Error) -> Self {
        match err {
            tasksync_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            tasksync_core::Error::Unauthorized => ApiError::Unauthorized,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<tasksync_crypto::CryptoError> for ApiError {
    fn from(err: tasksync_crypto::CryptoError) -> Self {
        // Server-side crypto errors are always internal: the codec here
        // only seals, and sealing does not depend on client input shape.
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Authentication failed".to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
