//! Admin back-office service.
//!
//! Wraps the remote collection API with the engine-side concerns: a TTL
//! cache for product reads, a last-known-good fallback for dashboard stats,
//! and the cross-view refresh signal after product writes. The wrapped API
//! stays a thin HTTP client so tests can substitute a stub.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use tracing::{info, instrument, warn};

use gilded_mango_core::{ProductId, UserId};

use crate::api::{
    AdminCollectionApi, AdminUser, ApiError, ListParams, Paged, ProductDraft, StatsSnapshot,
    Transaction, UserDraft, UserStatusUpdate,
};
use crate::catalog::CatalogItem;
use crate::signal::{RefreshEvent, RefreshSignal};

/// How long cached product reads stay fresh.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache key for API reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<CatalogItem>>),
}

/// The admin collection API plus engine-side caching and signalling.
#[derive(Clone)]
pub struct AdminService {
    inner: Arc<AdminServiceInner>,
}

struct AdminServiceInner {
    api: Arc<dyn AdminCollectionApi>,
    cache: Cache<CacheKey, CacheValue>,
    /// Last stats snapshot that made it over the wire, kept indefinitely so
    /// the dashboard can fall back to it instead of blanking on a transport
    /// failure.
    last_stats: Mutex<Option<StatsSnapshot>>,
    refresh: RefreshSignal,
}

impl AdminService {
    /// Create a service over any [`AdminCollectionApi`] backend.
    #[must_use]
    pub fn new(api: Arc<dyn AdminCollectionApi>, refresh: RefreshSignal) -> Self {
        let cache = Cache::builder()
            .max_capacity(8)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AdminServiceInner {
                api,
                cache,
                last_stats: Mutex::new(None),
                refresh,
            }),
        }
    }

    /// The refresh signal product writes publish to.
    #[must_use]
    pub fn refresh(&self) -> &RefreshSignal {
        &self.inner.refresh
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// The product catalog, cached for a few minutes between fetches.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog must be fetched and the fetch fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<CatalogItem>>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await
        {
            return Ok(products);
        }

        let products = Arc::new(self.inner.api.get_products().await?);
        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Create a product, then invalidate the cache and notify open views.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged; on failure nothing is invalidated
    /// and no refresh is published.
    #[instrument(skip(self, data), fields(name = %data.name))]
    pub async fn create_product(&self, data: &ProductDraft) -> Result<CatalogItem, ApiError> {
        let product = self.inner.api.create_product(data).await?;
        self.after_product_write().await;
        Ok(product)
    }

    /// Update a product, then invalidate the cache and notify open views.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged; on failure nothing is invalidated
    /// and no refresh is published.
    #[instrument(skip(self, data), fields(id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        data: &ProductDraft,
    ) -> Result<CatalogItem, ApiError> {
        let product = self.inner.api.update_product(id, data).await?;
        self.after_product_write().await;
        Ok(product)
    }

    /// Delete a product, then invalidate the cache and notify open views.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged; on failure nothing is invalidated
    /// and no refresh is published.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        self.inner.api.delete_product(id).await?;
        self.after_product_write().await;
        Ok(())
    }

    async fn after_product_write(&self) {
        self.inner.cache.invalidate(&CacheKey::Products).await;
        let notified = self.inner.refresh.publish(RefreshEvent::CatalogChanged);
        info!(notified, "Catalog changed, views notified");
    }

    // =========================================================================
    // Users and transactions (uncached pass-through)
    // =========================================================================

    /// List users.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged.
    pub async fn users(&self, params: &ListParams) -> Result<Paged<AdminUser>, ApiError> {
        self.inner.api.get_users(params).await
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged.
    pub async fn create_user(&self, data: &UserDraft) -> Result<AdminUser, ApiError> {
        self.inner.api.create_user(data).await
    }

    /// Toggle a user's active status.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged.
    pub async fn update_user_status(
        &self,
        id: &UserId,
        data: UserStatusUpdate,
    ) -> Result<AdminUser, ApiError> {
        self.inner.api.update_user_status(id, data).await
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged.
    pub async fn delete_user(&self, id: &UserId) -> Result<(), ApiError> {
        self.inner.api.delete_user(id).await
    }

    /// List transactions.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged.
    pub async fn transactions(&self, params: &ListParams) -> Result<Paged<Transaction>, ApiError> {
        self.inner.api.get_transactions(params).await
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Store-wide statistics.
    ///
    /// A transport failure falls back to the last snapshot that succeeded,
    /// so the dashboard degrades to stale data instead of blanking.
    ///
    /// # Errors
    ///
    /// Returns the API error when the fetch fails and no fallback exists,
    /// or when the failure is a deliberate rejection.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<StatsSnapshot, ApiError> {
        match self.inner.api.get_stats().await {
            Ok(snapshot) => {
                *lock(&self.inner.last_stats) = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) if e.is_transport() => {
                let cached = lock(&self.inner.last_stats).clone();
                cached.map_or(Err(e), |snapshot| {
                    warn!("Stats fetch failed, serving last-known-good snapshot");
                    Ok(snapshot)
                })
            }
            Err(e) => Err(e),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
