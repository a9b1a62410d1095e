//! Admin collection API client.
//!
//! Remote CRUD for products, users, and transactions plus the stats
//! endpoint. The engine consumes the response shapes and treats any error as
//! "operation failed, state unchanged"; caching and the cross-view refresh
//! signal live a layer up in [`crate::admin::AdminService`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use gilded_mango_core::{Email, Price, ProductId, Role, TransactionId, UserId};

use crate::catalog::CatalogItem;
use crate::config::ClientConfig;
use crate::store::{KeyValueStore, StoreKey};

use super::{ApiError, read_json};

/// Pagination/search parameters for list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            search: None,
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
}

/// Product fields accepted by create/update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub gender: String,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub price: Price,
    pub image: String,
    pub is_featured: bool,
    pub is_best_seller: bool,
}

/// User row as the back-office sees it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a user from the back-office.
#[derive(Debug, Clone, Serialize)]
pub struct UserDraft {
    pub name: String,
    pub email: Email,
    pub password: String,
    pub role: Role,
}

/// Status toggle payload.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UserStatusUpdate {
    pub active: bool,
}

/// A completed order as listed by the back-office.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub amount: Price,
    /// Display status string from the collaborator; not interpreted here.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Store-wide statistics for the admin dashboard.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub revenue: Price,
    pub orders: u64,
    pub users: u64,
    pub products: u64,
}

/// The remote admin collection API.
///
/// Contract: every call returns a success payload or an error with a
/// human-readable message; an error means the remote state is unchanged.
#[async_trait]
pub trait AdminCollectionApi: Send + Sync {
    async fn get_products(&self) -> Result<Vec<CatalogItem>, ApiError>;
    async fn create_product(&self, data: &ProductDraft) -> Result<CatalogItem, ApiError>;
    async fn update_product(
        &self,
        id: &ProductId,
        data: &ProductDraft,
    ) -> Result<CatalogItem, ApiError>;
    async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError>;

    async fn get_users(&self, params: &ListParams) -> Result<Paged<AdminUser>, ApiError>;
    async fn create_user(&self, data: &UserDraft) -> Result<AdminUser, ApiError>;
    async fn update_user_status(
        &self,
        id: &UserId,
        data: UserStatusUpdate,
    ) -> Result<AdminUser, ApiError>;
    async fn delete_user(&self, id: &UserId) -> Result<(), ApiError>;

    async fn get_transactions(&self, params: &ListParams) -> Result<Paged<Transaction>, ApiError>;
    async fn get_stats(&self) -> Result<StatsSnapshot, ApiError>;
}

/// `reqwest`-backed [`AdminCollectionApi`] implementation.
///
/// Reads the bearer token from the persistent store on each request, so a
/// login or logout takes effect immediately without rebuilding the client.
#[derive(Clone)]
pub struct HttpAdminApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<secrecy::SecretString>,
    store: KeyValueStore,
}

impl HttpAdminApi {
    /// Create a client from configuration and the shared store.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig, store: KeyValueStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            store,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.header("X-Api-Key", key.expose_secret());
        }
        // Absent or unreadable token just means an unauthenticated request;
        // the collaborator answers 401 and that surfaces as a rejection.
        if let Ok(Some(token)) = self.store.get::<String>(StoreKey::AuthToken) {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[async_trait]
impl AdminCollectionApi for HttpAdminApi {
    #[instrument(skip(self))]
    async fn get_products(&self) -> Result<Vec<CatalogItem>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/api/products")
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self, data), fields(name = %data.name))]
    async fn create_product(&self, data: &ProductDraft) -> Result<CatalogItem, ApiError> {
        let response = self
            .request(reqwest::Method::POST, "/api/products")
            .json(data)
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self, data), fields(id = %id))]
    async fn update_product(
        &self,
        id: &ProductId,
        data: &ProductDraft,
    ) -> Result<CatalogItem, ApiError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/api/products/{id}"))
            .json(data)
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/api/products/{id}"))
            .send()
            .await?;
        read_json::<serde_json::Value>(response).await?;
        Ok(())
    }

    #[instrument(skip(self, params))]
    async fn get_users(&self, params: &ListParams) -> Result<Paged<AdminUser>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/api/admin/users")
            .query(params)
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self, data), fields(email = %data.email))]
    async fn create_user(&self, data: &UserDraft) -> Result<AdminUser, ApiError> {
        let response = self
            .request(reqwest::Method::POST, "/api/admin/users")
            .json(data)
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self, data), fields(id = %id))]
    async fn update_user_status(
        &self,
        id: &UserId,
        data: UserStatusUpdate,
    ) -> Result<AdminUser, ApiError> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("/api/admin/users/{id}/status"))
            .json(&data)
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_user(&self, id: &UserId) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/api/admin/users/{id}"))
            .send()
            .await?;
        read_json::<serde_json::Value>(response).await?;
        Ok(())
    }

    #[instrument(skip(self, params))]
    async fn get_transactions(&self, params: &ListParams) -> Result<Paged<Transaction>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/api/admin/transactions")
            .query(params)
            .send()
            .await?;
        read_json(response).await
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> Result<StatsSnapshot, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/api/admin/stats")
            .send()
            .await?;
        read_json(response).await
    }
}
