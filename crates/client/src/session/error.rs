//! Authentication error types.

use thiserror::Error;

use gilded_mango_core::EmailError;

use crate::api::ApiError;
use crate::store::StoreError;

use super::password::PasswordIssue;

/// Errors that can occur during authentication operations.
///
/// Validation errors ([`AuthError::InvalidEmail`],
/// [`AuthError::WeakPassword`]) are caught before any network call.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password failed the client-side policy.
    #[error("password validation failed: {0}")]
    WeakPassword(#[from] PasswordIssue),

    /// The auth endpoint rejected the attempt; message passed on verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Transport or response-shape failure talking to the auth endpoint.
    #[error("auth request failed: {0}")]
    Api(ApiError),

    /// Persistent store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Fold an [`ApiError`] into the auth taxonomy: rejections keep their
    /// message, everything else stays transport-shaped.
    #[must_use]
    pub fn from_api(error: ApiError) -> Self {
        match error {
            ApiError::Rejected(message) | ApiError::NotFound(message) => Self::Rejected(message),
            other => Self::Api(other),
        }
    }

    /// Whether this failure is a transport problem worth retrying.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Api(ApiError::Http(_)))
    }

    /// The message shown to the user.
    ///
    /// Remote rejections and validation failures are specific; transport
    /// failures collapse to a generic retryable message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::InvalidEmail(e) => e.to_string(),
            Self::WeakPassword(issue) => issue.to_string(),
            Self::Api(_) => "Something went wrong, please try again".to_string(),
            Self::Store(_) => "Could not save your session on this device".to_string(),
        }
    }
}
