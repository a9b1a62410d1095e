//! Auth endpoint client.
//!
//! Covers login, register, and whoami (token validation). Request and
//! response bodies follow the commerce API contract:
//! `{email, password}` / `{name, email, password}` in,
//! `{success, token, user}` out.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gilded_mango_core::{Email, Role, UserId};

use crate::config::ClientConfig;

use super::{ApiError, read_json};

/// User shape returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    /// Avatar location, if the account has one.
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Successful login/register payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub success: bool,
    pub token: String,
    pub user: WireUser,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// The auth endpoints the session machine talks to.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token and profile.
    async fn login(&self, email: &Email, password: &str) -> Result<AuthPayload, ApiError>;

    /// Create an account; same response contract as login.
    async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<AuthPayload, ApiError>;

    /// Validate a stored token and fetch the profile behind it.
    async fn current_user(&self, token: &SecretString) -> Result<WireUser, ApiError>;
}

/// `reqwest`-backed [`AuthApi`] implementation.
#[derive(Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpAuthApi {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.header("X-Api-Key", key.expose_secret());
        }
        builder
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &Email, password: &str) -> Result<AuthPayload, ApiError> {
        let response = self
            .request(reqwest::Method::POST, "/api/auth/login")
            .json(&LoginRequest {
                email: email.as_str(),
                password,
            })
            .send()
            .await?;

        read_json(response).await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<AuthPayload, ApiError> {
        let response = self
            .request(reqwest::Method::POST, "/api/auth/register")
            .json(&RegisterRequest {
                name,
                email: email.as_str(),
                password,
            })
            .send()
            .await?;

        read_json(response).await
    }

    #[instrument(skip_all)]
    async fn current_user(&self, token: &SecretString) -> Result<WireUser, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/api/auth/me")
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        read_json(response).await
    }
}
