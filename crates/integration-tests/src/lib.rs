//! Integration test fixtures for Gilded Mango.
//!
//! Runs the whole client engine in-process: an [`AppContext`] wired to stub
//! implementations of the auth endpoints and the admin collection API, with
//! the persistent store rooted in a temp directory. No network, no servers.
//!
//! # Usage
//!
//! ```rust,ignore
//! let harness = TestHarness::new();
//! let ctx = harness.context();
//! ctx.init().await.unwrap();
//! ```

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};

use gilded_mango_client::api::{
    AdminCollectionApi, AdminUser, ApiError, AuthApi, AuthPayload, ListParams, Paged, ProductDraft,
    StatsSnapshot, Transaction, UserDraft, UserStatusUpdate, WireUser,
};
use gilded_mango_client::catalog::CatalogItem;
use gilded_mango_client::config::ClientConfig;
use gilded_mango_client::context::AppContext;
use gilded_mango_core::{Email, Price, ProductId, Role, UserId};

// =============================================================================
// Configuration
// =============================================================================

/// Install a tracing subscriber once for the whole test binary.
///
/// Controlled by `RUST_LOG`; silent by default.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a [`ClientConfig`] pointing at a temp data directory.
#[must_use]
pub fn test_config(data_dir: &Path) -> ClientConfig {
    ClientConfig {
        api_base_url: "https://api.test.invalid".to_string(),
        data_dir: data_dir.to_path_buf(),
        api_key: None,
        http_timeout: Duration::from_secs(1),
        stats_poll_interval: Duration::from_millis(20),
    }
}

// =============================================================================
// Stub auth endpoints
// =============================================================================

struct Account {
    name: String,
    email: String,
    password: String,
    avatar: Option<String>,
}

struct AuthState {
    accounts: Vec<Account>,
    tokens: HashMap<String, WireUser>,
}

/// In-memory auth endpoints: register/login mint tokens, whoami validates
/// them. Rejections mirror the real collaborator's messages.
pub struct StubAuthApi {
    state: Mutex<AuthState>,
    token_counter: AtomicUsize,
    /// Number of network-shaped calls received.
    pub calls: AtomicUsize,
}

impl StubAuthApi {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AuthState {
                accounts: Vec::new(),
                tokens: HashMap::new(),
            }),
            token_counter: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Seed an account that can log in.
    pub fn add_account(&self, name: &str, email: &str, password: &str, avatar: Option<&str>) {
        self.state.lock().unwrap().accounts.push(Account {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            avatar: avatar.map(str::to_string),
        });
    }

    /// Invalidate every issued token (server-side session wipe).
    pub fn revoke_all_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }

    fn mint(&self, user: WireUser) -> AuthPayload {
        let token = format!("tok-{}", self.token_counter.fetch_add(1, Ordering::SeqCst));
        self.state
            .lock()
            .unwrap()
            .tokens
            .insert(token.clone(), user.clone());
        AuthPayload {
            success: true,
            token,
            user,
        }
    }
}

impl Default for StubAuthApi {
    fn default() -> Self {
        Self::new()
    }
}

fn wire_user(name: &str, email: &str, avatar: Option<String>) -> WireUser {
    WireUser {
        id: UserId::new(format!("u-{email}")),
        name: name.to_string(),
        email: Email::parse(email).unwrap(),
        role: Role::User,
        avatar,
    }
}

#[async_trait]
impl AuthApi for StubAuthApi {
    async fn login(&self, email: &Email, password: &str) -> Result<AuthPayload, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let user = {
            let state = self.state.lock().unwrap();
            state
                .accounts
                .iter()
                .find(|a| a.email == email.as_str() && a.password == password)
                .map(|a| wire_user(&a.name, &a.email, a.avatar.clone()))
        };
        user.map(|u| self.mint(u))
            .ok_or_else(|| ApiError::Rejected("Invalid credentials".to_string()))
    }

    async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<AuthPayload, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.lock().unwrap();
            if state.accounts.iter().any(|a| a.email == email.as_str()) {
                return Err(ApiError::Rejected(
                    "An account with this email already exists".to_string(),
                ));
            }
            state.accounts.push(Account {
                name: name.to_string(),
                email: email.as_str().to_string(),
                password: password.to_string(),
                avatar: None,
            });
        }
        Ok(self.mint(wire_user(name, email.as_str(), None)))
    }

    async fn current_user(&self, token: &SecretString) -> Result<WireUser, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .tokens
            .get(token.expose_secret())
            .cloned()
            .ok_or_else(|| ApiError::Rejected("Session expired".to_string()))
    }
}

// =============================================================================
// Stub admin collection API
// =============================================================================

/// In-memory admin collection API over a seedable product list.
pub struct StubAdminApi {
    products: Mutex<Vec<CatalogItem>>,
    id_counter: AtomicUsize,
    /// When set, every call fails as if the network were down.
    pub unreachable: AtomicBool,
    /// When set, write calls are rejected (e.g. missing permission).
    pub reject_writes: AtomicBool,
    /// Number of `get_stats` calls received.
    pub stats_calls: AtomicUsize,
}

impl StubAdminApi {
    #[must_use]
    pub fn new(products: Vec<CatalogItem>) -> Self {
        Self {
            products: Mutex::new(products),
            id_counter: AtomicUsize::new(1000),
            unreachable: AtomicBool::new(false),
            reject_writes: AtomicBool::new(false),
            stats_calls: AtomicUsize::new(0),
        }
    }

    /// Fabricate a transport-level failure.
    ///
    /// Built from a request that fails before any I/O (empty host), so no
    /// real network is involved.
    async fn transport_error() -> ApiError {
        let err = reqwest::Client::new()
            .get("http://")
            .send()
            .await
            .expect_err("empty-host request must fail");
        ApiError::Http(err)
    }

    async fn gate(&self) -> Result<(), ApiError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Self::transport_error().await);
        }
        Ok(())
    }

    fn gate_write(&self) -> Result<(), ApiError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected("Not authorized".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AdminCollectionApi for StubAdminApi {
    async fn get_products(&self) -> Result<Vec<CatalogItem>, ApiError> {
        self.gate().await?;
        Ok(self.products.lock().unwrap().clone())
    }

    async fn create_product(&self, data: &ProductDraft) -> Result<CatalogItem, ApiError> {
        self.gate().await?;
        self.gate_write()?;

        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let item = CatalogItem {
            id: ProductId::new(format!("p-{id}")),
            name: data.name.clone(),
            description: data.description.clone(),
            category: data.category.clone(),
            brand: data.brand.clone(),
            gender: data.gender.clone(),
            colors: data.colors.clone(),
            sizes: data.sizes.clone(),
            price: data.price,
            image: data.image.clone(),
            created_at: Utc::now(),
            is_featured: data.is_featured,
            is_best_seller: data.is_best_seller,
        };
        self.products.lock().unwrap().push(item.clone());
        Ok(item)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        data: &ProductDraft,
    ) -> Result<CatalogItem, ApiError> {
        self.gate().await?;
        self.gate_write()?;

        let mut products = self.products.lock().unwrap();
        let item = products
            .iter_mut()
            .find(|p| p.id == *id)
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {id}")))?;
        item.name = data.name.clone();
        item.price = data.price;
        Ok(item.clone())
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        self.gate().await?;
        self.gate_write()?;
        self.products.lock().unwrap().retain(|p| p.id != *id);
        Ok(())
    }

    async fn get_users(&self, _params: &ListParams) -> Result<Paged<AdminUser>, ApiError> {
        self.gate().await?;
        Ok(Paged {
            items: Vec::new(),
            total: 0,
            page: 1,
        })
    }

    async fn create_user(&self, data: &UserDraft) -> Result<AdminUser, ApiError> {
        self.gate().await?;
        self.gate_write()?;
        Ok(AdminUser {
            id: UserId::new(format!("u-{}", data.email)),
            name: data.name.clone(),
            email: data.email.clone(),
            role: data.role,
            active: true,
            created_at: Utc::now(),
        })
    }

    async fn update_user_status(
        &self,
        id: &UserId,
        data: UserStatusUpdate,
    ) -> Result<AdminUser, ApiError> {
        self.gate().await?;
        self.gate_write()?;
        Ok(AdminUser {
            id: id.clone(),
            name: "stub".to_string(),
            email: Email::parse("stub@example.com").unwrap(),
            role: Role::User,
            active: data.active,
            created_at: Utc::now(),
        })
    }

    async fn delete_user(&self, _id: &UserId) -> Result<(), ApiError> {
        self.gate().await?;
        self.gate_write()?;
        Ok(())
    }

    async fn get_transactions(&self, _params: &ListParams) -> Result<Paged<Transaction>, ApiError> {
        self.gate().await?;
        Ok(Paged {
            items: Vec::new(),
            total: 0,
            page: 1,
        })
    }

    async fn get_stats(&self) -> Result<StatsSnapshot, ApiError> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        let products = self.products.lock().unwrap().len() as u64;
        Ok(StatsSnapshot {
            revenue: Price::from_major(1234),
            orders: 42,
            users: 7,
            products,
        })
    }
}

// =============================================================================
// Catalog fixtures
// =============================================================================

/// A catalog item with sensible defaults for tests.
#[must_use]
pub fn catalog_item(id: &str, name: &str, brand: &str, category: &str, price: i64) -> CatalogItem {
    CatalogItem {
        id: ProductId::new(id),
        name: name.to_string(),
        description: format!("{name} by {brand}"),
        category: category.to_string(),
        brand: brand.to_string(),
        gender: "men".to_string(),
        colors: vec!["Black".to_string(), "White".to_string()],
        sizes: vec!["M".to_string(), "L".to_string()],
        price: Price::from_major(price),
        image: format!("/img/{id}.jpg"),
        created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        is_featured: false,
        is_best_seller: false,
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Everything a scenario test needs: the context plus handles to the stubs
/// behind it.
pub struct TestHarness {
    pub context: AppContext,
    pub auth: std::sync::Arc<StubAuthApi>,
    pub admin: std::sync::Arc<StubAdminApi>,
    config: ClientConfig,
    _data_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Build a harness with the given catalog and one seeded account
    /// (`maya@example.com` / `Sunlit9Harbor`).
    #[must_use]
    pub fn with_catalog(products: Vec<CatalogItem>) -> Self {
        init_tracing();
        let data_dir = tempfile::tempdir().unwrap();
        let config = test_config(data_dir.path());

        let auth = std::sync::Arc::new(StubAuthApi::new());
        auth.add_account("Maya", "maya@example.com", "Sunlit9Harbor", None);
        let admin = std::sync::Arc::new(StubAdminApi::new(products));

        let context = AppContext::new(config.clone(), auth.clone(), admin.clone()).unwrap();
        Self {
            context,
            auth,
            admin,
            config,
            _data_dir: data_dir,
        }
    }

    /// A second context over the same data directory and stubs, as if the
    /// app were relaunched on the same device.
    #[must_use]
    pub fn relaunched_context(&self) -> AppContext {
        AppContext::new(self.config.clone(), self.auth.clone(), self.admin.clone()).unwrap()
    }

    /// Harness over an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(Vec::new())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
