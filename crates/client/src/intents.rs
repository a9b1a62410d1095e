//! Deferred identity-bound actions.
//!
//! When an anonymous visitor tries to add to the cart or wishlist, the
//! action is captured here instead of executed, and the visitor is routed to
//! authentication. On the next transition into `authenticated` the captured
//! intents replay into the collections exactly once.
//!
//! At most one intent per kind is ever queued: a new capture of the same
//! kind overwrites the previous one. A cart intent and a wishlist intent
//! captured in the same anonymous session both survive to replay — they live
//! under separate store keys.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use gilded_mango_core::{Price, ProductId};

use crate::collections::{CommerceCollections, LineEntry, WishlistEntry};
use crate::store::{KeyValueStore, StoreError, StoreKey};

/// The product fields frozen into an intent at capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub brand: String,
}

impl From<&crate::catalog::CatalogItem> for ProductSnapshot {
    fn from(item: &crate::catalog::CatalogItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            image: item.image.clone(),
            brand: item.brand.clone(),
        }
    }
}

/// A captured add-to-cart action awaiting authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartIntent {
    pub product: ProductSnapshot,
    pub size: Option<String>,
    pub color: String,
    pub quantity: u32,
}

/// A captured add-to-wishlist action awaiting authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistIntent {
    pub product: ProductSnapshot,
}

/// Why a stored intent could not be turned into a collection entry.
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("intent has an empty product id")]
    EmptyProductId,
    #[error("cart intent has zero quantity")]
    ZeroQuantity,
}

impl CartIntent {
    fn into_line_entry(self) -> Result<LineEntry, IntentError> {
        if self.product.id.as_str().is_empty() {
            return Err(IntentError::EmptyProductId);
        }
        if self.quantity == 0 {
            return Err(IntentError::ZeroQuantity);
        }

        Ok(LineEntry {
            product_id: self.product.id,
            name: self.product.name,
            price: self.product.price,
            image: self.product.image,
            brand: self.product.brand,
            size: self.size,
            color: self.color,
            quantity: self.quantity,
        })
    }
}

impl WishlistIntent {
    fn into_wishlist_entry(self) -> Result<WishlistEntry, IntentError> {
        if self.product.id.as_str().is_empty() {
            return Err(IntentError::EmptyProductId);
        }

        Ok(WishlistEntry {
            product_id: self.product.id,
            name: self.product.name,
            price: self.product.price,
            image: self.product.image,
            brand: self.product.brand,
        })
    }
}

/// What a replay actually merged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    /// Resulting cart quantity, if a cart intent merged.
    pub cart_quantity: Option<u32>,
    /// Whether a wishlist intent merged a new entry.
    pub wishlist_added: bool,
}

/// Captures at most one cart intent and one wishlist intent while the
/// session is anonymous, and replays them after authentication.
#[derive(Clone)]
pub struct DeferredActionQueue {
    store: KeyValueStore,
}

impl DeferredActionQueue {
    /// Create a queue backed by `store`.
    #[must_use]
    pub const fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    /// Capture an add-to-cart attempted while anonymous.
    ///
    /// Overwrites any previously captured cart intent, and records where the
    /// visitor should land after authenticating.
    ///
    /// # Errors
    ///
    /// Returns an error if the intent cannot be persisted.
    #[instrument(skip(self, intent), fields(product = %intent.product.id))]
    pub fn capture_cart_intent(
        &self,
        intent: &CartIntent,
        return_to: &str,
    ) -> Result<(), StoreError> {
        self.store.put(StoreKey::CartIntent, intent)?;
        self.store.put(StoreKey::ReturnTo, &return_to)?;
        info!("Captured cart intent pending authentication");
        Ok(())
    }

    /// Capture an add-to-wishlist attempted while anonymous.
    ///
    /// Same overwrite semantics as [`capture_cart_intent`](Self::capture_cart_intent).
    ///
    /// # Errors
    ///
    /// Returns an error if the intent cannot be persisted.
    #[instrument(skip(self, intent), fields(product = %intent.product.id))]
    pub fn capture_wishlist_intent(
        &self,
        intent: &WishlistIntent,
        return_to: &str,
    ) -> Result<(), StoreError> {
        self.store.put(StoreKey::WishlistIntent, intent)?;
        self.store.put(StoreKey::ReturnTo, &return_to)?;
        info!("Captured wishlist intent pending authentication");
        Ok(())
    }

    /// Replay captured intents into the collections.
    ///
    /// Runs synchronously right after the session becomes authenticated.
    /// Each intent is taken out of the store *before* it merges, so replay
    /// is at-most-once even under duplicate auth events. Failures are logged
    /// and discarded — by the time a malformed intent is detected the user
    /// has moved on, and retrying would re-surface a stale action forever.
    pub fn replay(&self, collections: &mut CommerceCollections) -> ReplayReport {
        let mut report = ReplayReport::default();

        match self.store.take::<CartIntent>(StoreKey::CartIntent) {
            Ok(Some(intent)) => match intent.into_line_entry() {
                Ok(entry) => match collections.cart_add(entry) {
                    Ok(quantity) => {
                        info!(quantity, "Replayed deferred cart intent");
                        report.cart_quantity = Some(quantity);
                    }
                    Err(e) => warn!(error = %e, "Discarding cart intent: merge failed"),
                },
                Err(e) => warn!(error = %e, "Discarding malformed cart intent"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read cart intent, skipping"),
        }

        match self.store.take::<WishlistIntent>(StoreKey::WishlistIntent) {
            Ok(Some(intent)) => match intent.into_wishlist_entry() {
                Ok(entry) => match collections.wishlist_add(entry) {
                    Ok(added) => {
                        info!(added, "Replayed deferred wishlist intent");
                        report.wishlist_added = added;
                    }
                    Err(e) => warn!(error = %e, "Discarding wishlist intent: merge failed"),
                },
                Err(e) => warn!(error = %e, "Discarding malformed wishlist intent"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read wishlist intent, skipping"),
        }

        report
    }

    /// Consume the recorded return-to location, if any.
    #[must_use]
    pub fn take_return_to(&self) -> Option<String> {
        self.store.take(StoreKey::ReturnTo).ok().flatten()
    }

    /// Whether a cart intent is currently queued.
    #[must_use]
    pub fn has_cart_intent(&self) -> bool {
        self.store.contains(StoreKey::CartIntent)
    }

    /// Whether a wishlist intent is currently queued.
    #[must_use]
    pub fn has_wishlist_intent(&self) -> bool {
        self.store.contains(StoreKey::WishlistIntent)
    }
}
