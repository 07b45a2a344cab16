//! HTTP error responses of the facilitator.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mx402::relay::RelayError;

/// Errors that end a facilitator request with a non-200 status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body could not be parsed.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// The relay pipeline rejected the transaction.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Relay(err) => match err {
                RelayError::MalformedPayload(_) | RelayError::InvalidSignature => {
                    StatusCode::BAD_REQUEST
                }
                RelayError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
                RelayError::Network(_) => StatusCode::BAD_GATEWAY,
                RelayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), axum::Json(body)).into_response()
    }
}
