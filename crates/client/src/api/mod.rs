//! HTTP clients for the auth endpoints and the admin collection API.
//!
//! # Architecture
//!
//! - Each remote collaborator is a trait ([`AuthApi`], [`AdminCollectionApi`])
//!   so the engine is testable without a network
//! - The `Http*` implementations use `reqwest` with JSON bodies
//! - Every call either returns a success payload or an [`ApiError`]; a failed
//!   call never leaves partial state behind
//!
//! Remote rejections carry the collaborator's message verbatim; transport
//! failures are generic and retryable.

mod admin;
mod auth;

pub use admin::{
    AdminCollectionApi, AdminUser, HttpAdminApi, ListParams, Paged, ProductDraft, StatsSnapshot,
    Transaction, UserDraft, UserStatusUpdate,
};
pub use auth::{AuthApi, AuthPayload, HttpAuthApi, WireUser};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when calling a remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (network unreachable, timeout). Retryable.
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The collaborator rejected the operation; message passed on verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether this error is a transport failure worth retrying (as opposed
    /// to a deliberate rejection).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// Error body shape shared by the commerce API endpoints.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Decode a response, mapping non-success statuses to typed errors.
///
/// Reads the body as text first so a rejection message can be surfaced even
/// when the payload shape is unexpected.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| format!("HTTP {status}"));

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(message));
        }
        return Err(ApiError::Rejected(message));
    }

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse API response"
        );
        ApiError::Parse(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_is_verbatim() {
        let err = ApiError::Rejected("Email already in use".to_string());
        assert_eq!(err.to_string(), "Email already in use");
    }

    #[test]
    fn test_is_transport() {
        assert!(!ApiError::Rejected("nope".to_string()).is_transport());
        assert!(!ApiError::NotFound("x".to_string()).is_transport());
    }
}
