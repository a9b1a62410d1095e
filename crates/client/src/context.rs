//! The application context.
//!
//! One explicitly constructed object owning every engine component, in place
//! of module-level mutable state. Lifecycle is explicit: [`AppContext::init`]
//! rehydrates from the persistent store and restores the session;
//! [`AppContext::teardown`] cancels polling and flushes snapshots.
//!
//! The context is also where identity-bound actions are gated: an anonymous
//! add-to-cart is captured for replay and the caller is pointed at the login
//! route, instead of mutating the cart.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{debug, instrument};

use crate::admin::AdminService;
use crate::api::{AdminCollectionApi, AuthApi, HttpAdminApi, HttpAuthApi, StatsSnapshot};
use crate::catalog::{CatalogFilterEngine, CatalogItem};
use crate::collections::{CommerceCollections, LineEntry};
use crate::config::ClientConfig;
use crate::error::{EngineError, Result};
use crate::intents::{CartIntent, DeferredActionQueue, WishlistIntent};
use crate::poll::StatsPoller;
use crate::session::{SessionEvent, SessionStateMachine, SessionStatus};
use crate::signal::{RefreshEvent, RefreshSignal};
use crate::store::KeyValueStore;

/// Where visitors are sent to authenticate.
pub const LOGIN_ROUTE: &str = "/login";

/// Outcome of an identity-bound action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatedOutcome {
    /// The action ran; `quantity` is the resulting line quantity.
    Completed { quantity: u32 },
    /// The visitor must authenticate first; the action was captured and will
    /// replay after login.
    AuthRequired { login_route: &'static str },
}

/// The constructed application context shared by all consumers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    config: ClientConfig,
    store: KeyValueStore,
    session: SessionStateMachine,
    queue: DeferredActionQueue,
    collections: Arc<Mutex<CommerceCollections>>,
    catalog: Mutex<CatalogFilterEngine>,
    admin: AdminService,
    poller: Mutex<Option<StatsPoller>>,
}

impl AppContext {
    /// Build a context over the HTTP API clients, loading configuration from
    /// the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing/invalid or the data
    /// directory cannot be created.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_http(config)
    }

    /// Build a context over the HTTP API clients with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or an HTTP
    /// client cannot be built.
    pub fn with_http(config: ClientConfig) -> Result<Self> {
        let store = KeyValueStore::open(&config.data_dir)?;
        let auth = Arc::new(HttpAuthApi::new(&config)?);
        let admin = Arc::new(HttpAdminApi::new(&config, store.clone())?);
        Self::assemble(config, store, auth, admin)
    }

    /// Build a context over arbitrary API implementations.
    ///
    /// This is the seam tests use to run the whole engine against in-process
    /// stubs.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn new(
        config: ClientConfig,
        auth: Arc<dyn AuthApi>,
        admin_api: Arc<dyn AdminCollectionApi>,
    ) -> Result<Self> {
        let store = KeyValueStore::open(&config.data_dir)?;
        Self::assemble(config, store, auth, admin_api)
    }

    fn assemble(
        config: ClientConfig,
        store: KeyValueStore,
        auth: Arc<dyn AuthApi>,
        admin_api: Arc<dyn AdminCollectionApi>,
    ) -> Result<Self> {
        let session = SessionStateMachine::new(auth, store.clone());
        let queue = DeferredActionQueue::new(store.clone());
        let collections = Arc::new(Mutex::new(CommerceCollections::new(store.clone())));
        let catalog = Mutex::new(CatalogFilterEngine::new(store.clone()));
        let admin = AdminService::new(admin_api, RefreshSignal::new());

        // The queue subscribes to exactly the authenticated event: replay
        // runs synchronously once the session is already authenticated, so a
        // replay failure can never wedge the transition.
        let replay_queue = queue.clone();
        let replay_collections = collections.clone();
        session.subscribe(move |event| match event {
            SessionEvent::Authenticated => {
                let mut collections = lock(&replay_collections);
                replay_queue.replay(&mut collections);
            }
            SessionEvent::LoggedOut => {}
        });

        Ok(Self {
            inner: Arc::new(ContextInner {
                config,
                store,
                session,
                queue,
                collections,
                catalog,
                admin,
                poller: Mutex::new(None),
            }),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Rehydrate persisted state and restore the session.
    ///
    /// A stored token that validates triggers deferred-intent replay
    /// immediately; a token the endpoint rejects just leaves the session
    /// anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error only for store I/O failures; a failed session
    /// restore is an expected outcome, recorded in the session's last error.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<()> {
        lock(&self.inner.collections).rehydrate()?;
        lock(&self.inner.catalog).rehydrate()?;

        if let Err(e) = self.inner.session.restore_session().await {
            debug!(error = %e, "Session restore did not authenticate");
        }
        Ok(())
    }

    /// Cancel background work and flush snapshots.
    ///
    /// Idempotent; safe to call without [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns an error if a snapshot cannot be flushed.
    #[instrument(skip(self))]
    pub fn teardown(&self) -> Result<()> {
        if let Some(poller) = lock(&self.inner.poller).take() {
            poller.cancel();
        }
        lock(&self.inner.collections).flush()?;
        Ok(())
    }

    // =========================================================================
    // Identity-bound actions
    // =========================================================================

    /// Add a product to the cart, or capture the intent if anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture or the cart snapshot cannot be
    /// persisted.
    #[instrument(skip(self, item), fields(product = %item.id))]
    pub fn add_to_cart(
        &self,
        item: &CatalogItem,
        size: Option<String>,
        color: String,
        quantity: u32,
        current_location: &str,
    ) -> Result<GatedOutcome> {
        if self.inner.session.status() != SessionStatus::Authenticated {
            let intent = CartIntent {
                product: item.into(),
                size,
                color,
                quantity,
            };
            self.inner
                .queue
                .capture_cart_intent(&intent, current_location)?;
            return Ok(GatedOutcome::AuthRequired {
                login_route: LOGIN_ROUTE,
            });
        }

        let entry = LineEntry {
            product_id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            image: item.image.clone(),
            brand: item.brand.clone(),
            size,
            color,
            quantity,
        };
        let quantity = lock(&self.inner.collections).cart_add(entry)?;
        Ok(GatedOutcome::Completed { quantity })
    }

    /// Add a product to the wishlist, or capture the intent if anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture or the wishlist snapshot cannot be
    /// persisted.
    #[instrument(skip(self, item), fields(product = %item.id))]
    pub fn add_to_wishlist(
        &self,
        item: &CatalogItem,
        current_location: &str,
    ) -> Result<GatedOutcome> {
        if self.inner.session.status() != SessionStatus::Authenticated {
            let intent = WishlistIntent {
                product: item.into(),
            };
            self.inner
                .queue
                .capture_wishlist_intent(&intent, current_location)?;
            return Ok(GatedOutcome::AuthRequired {
                login_route: LOGIN_ROUTE,
            });
        }

        lock(&self.inner.collections).wishlist_add(crate::collections::WishlistEntry {
            product_id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            image: item.image.clone(),
            brand: item.brand.clone(),
        })?;
        Ok(GatedOutcome::Completed { quantity: 1 })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch the product catalog and hand it to the filter engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails; the engine keeps its previous
    /// catalog in that case.
    pub async fn load_catalog(&self) -> Result<()> {
        let products = self.inner.admin.products().await?;
        lock(&self.inner.catalog).set_catalog((*products).clone());
        Ok(())
    }

    /// Subscribe to cross-view refresh events (published after admin product
    /// writes).
    #[must_use]
    pub fn subscribe_refresh(&self) -> broadcast::Receiver<RefreshEvent> {
        self.inner.admin.refresh().subscribe()
    }

    // =========================================================================
    // Stats polling
    // =========================================================================

    /// Start (or restart) the periodic stats poll.
    ///
    /// The returned receiver carries the latest snapshot. The poller runs
    /// until [`teardown`](Self::teardown) or the next call here.
    pub fn start_stats_polling(&self) -> watch::Receiver<Option<StatsSnapshot>> {
        let (poller, rx) = StatsPoller::spawn(
            self.inner.admin.clone(),
            self.inner.config.stats_poll_interval,
        );
        if let Some(previous) = lock(&self.inner.poller).replace(poller) {
            previous.cancel();
        }
        rx
    }

    // =========================================================================
    // Component access
    // =========================================================================

    /// The session state machine.
    #[must_use]
    pub fn session(&self) -> &SessionStateMachine {
        &self.inner.session
    }

    /// The deferred action queue.
    #[must_use]
    pub fn queue(&self) -> &DeferredActionQueue {
        &self.inner.queue
    }

    /// The cart and wishlist, behind their lock.
    #[must_use]
    pub fn collections(&self) -> MutexGuard<'_, CommerceCollections> {
        lock(&self.inner.collections)
    }

    /// The catalog filter engine, behind its lock.
    #[must_use]
    pub fn catalog(&self) -> MutexGuard<'_, CatalogFilterEngine> {
        lock(&self.inner.catalog)
    }

    /// The admin back-office service.
    #[must_use]
    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The persistent key/value store.
    #[must_use]
    pub fn store(&self) -> &KeyValueStore {
        &self.inner.store
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
