//! Unified engine error type.
//!
//! Every failure in this crate is scoped to the operation that produced it
//! and leaves prior state intact; nothing here is fatal to the host.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::session::AuthError;
use crate::store::StoreError;

/// Application-level error type for the client engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Persistent store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Remote API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Result type alias for `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;
