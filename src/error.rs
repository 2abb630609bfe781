// Error types for the birdfeed service.
// Separates validation, upstream-reported, and transport failures so
// the HTTP boundary can map each to the right status code.

use serde_json::{Value, json};
use thiserror::Error;

use crate::upstream::types::RateLimit;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing or invalid parameter: {0}")]
    Validation(String),

    #[error("upstream API error: HTTP {status}")]
    Upstream {
        status: u16,
        body: Value,
        rate_limit: RateLimit,
    },

    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("bearer credential is not a valid header value")]
    InvalidToken,

    #[error("missing X_BEARER_TOKEN environment variable")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// HTTP status this error maps to at the service boundary.
    /// Upstream errors keep the upstream status; transport failures
    /// are a bad gateway.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::Upstream { status, .. } => *status,
            ApiError::Transport(_) => 502,
            ApiError::UserNotFound(_) => 404,
            ApiError::InvalidToken | ApiError::MissingToken => 500,
        }
    }

    /// Structured JSON payload rendered to the client.
    pub fn payload(&self) -> Value {
        match self {
            ApiError::Validation(message) => json!({ "error": message }),
            ApiError::Upstream {
                status,
                body,
                rate_limit,
            } => json!({
                "error": "x_api_error",
                "status": status,
                "body": body,
                "rate_limit": rate_limit,
            }),
            ApiError::Transport(e) => json!({ "error": "http_error", "detail": e.to_string() }),
            ApiError::UserNotFound(username) => {
                json!({ "error": "user_not_found", "username": username })
            }
            ApiError::InvalidToken | ApiError::MissingToken => {
                json!({ "error": self.to_string() })
            }
        }
    }
}
