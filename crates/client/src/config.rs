//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GILDED_MANGO_API_BASE_URL` - Base URL of the commerce API (auth + admin
//!   collection endpoints)
//!
//! ## Optional
//! - `GILDED_MANGO_DATA_DIR` - Directory for the persistent key/value store
//!   (default: `.gilded-mango`)
//! - `GILDED_MANGO_API_KEY` - Storefront API key sent with every request
//! - `GILDED_MANGO_HTTP_TIMEOUT_SECS` - HTTP request timeout (default: 10)
//! - `GILDED_MANGO_STATS_POLL_SECS` - Admin stats poll interval (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client engine configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the commerce API, without a trailing slash.
    pub api_base_url: String,
    /// Directory backing the persistent key/value store.
    pub data_dir: PathBuf,
    /// Optional storefront API key.
    pub api_key: Option<SecretString>,
    /// HTTP request timeout.
    pub http_timeout: Duration,
    /// Interval between admin stats polls.
    pub stats_poll_interval: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("data_dir", &self.data_dir)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("http_timeout", &self.http_timeout)
            .field("stats_poll_interval", &self.stats_poll_interval)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(&get_required_env("GILDED_MANGO_API_BASE_URL")?)?;
        let data_dir = PathBuf::from(get_env_or_default("GILDED_MANGO_DATA_DIR", ".gilded-mango"));
        let api_key = get_optional_env("GILDED_MANGO_API_KEY").map(SecretString::from);
        let http_timeout = get_duration_secs("GILDED_MANGO_HTTP_TIMEOUT_SECS", 10)?;
        let stats_poll_interval = get_duration_secs("GILDED_MANGO_STATS_POLL_SECS", 30)?;

        Ok(Self {
            api_base_url,
            data_dir,
            api_key,
            http_timeout,
            stats_poll_interval,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate a base URL and normalize it (no trailing slash).
fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidEnvVar("GILDED_MANGO_API_BASE_URL".to_string(), e.to_string())
    })?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "GILDED_MANGO_API_BASE_URL".to_string(),
            "must have a host".to_string(),
        ));
    }

    Ok(raw.trim_end_matches('/').to_string())
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a duration (in seconds) environment variable with a default.
fn get_duration_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(Duration::from_secs(default)),
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}
