//! Cart and wishlist collections.
//!
//! Both collections share one keyed reducer shape: entries merge by identity
//! key on arrival, removal is idempotent, and every mutation persists a
//! snapshot to the store. Derived totals are recomputed from scratch on read
//! so partial updates can never leave them stale.

mod keyed;

pub use keyed::{CollectionEntry, KeyedCollection};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use gilded_mango_core::{Price, ProductId};

use crate::store::{KeyValueStore, StoreError, StoreKey};

/// Quantity ceiling for a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 10;

/// One cart line.
///
/// Identity is `(product_id, size, color)`; `size` is `None` for size-less
/// goods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEntry {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub brand: String,
    pub size: Option<String>,
    pub color: String,
    pub quantity: u32,
}

/// The identity key of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: String,
}

impl LineEntry {
    /// This line's identity key.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }
}

impl CollectionEntry for LineEntry {
    type Key = LineKey;

    fn key(&self) -> LineKey {
        Self::key(self)
    }

    fn absorb(&mut self, incoming: Self) -> u32 {
        self.quantity = (self.quantity + incoming.quantity).min(MAX_LINE_QUANTITY);
        self.quantity
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// One wishlist entry. Identity is the product alone; duplicates no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub brand: String,
}

impl CollectionEntry for WishlistEntry {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.product_id.clone()
    }

    fn absorb(&mut self, _incoming: Self) -> u32 {
        // Duplicate adds are idempotent.
        1
    }

    fn quantity(&self) -> u32 {
        1
    }
}

/// The closed set of cart mutations.
#[derive(Debug, Clone)]
pub enum CartCommand {
    Add(LineEntry),
    Remove(LineKey),
    SetQuantity { key: LineKey, quantity: u32 },
}

/// The closed set of wishlist mutations.
#[derive(Debug, Clone)]
pub enum WishlistCommand {
    Add(WishlistEntry),
    Remove(ProductId),
}

/// The cart and wishlist, persisted independently of auth state.
pub struct CommerceCollections {
    store: KeyValueStore,
    cart: KeyedCollection<LineEntry>,
    wishlist: KeyedCollection<WishlistEntry>,
}

impl CommerceCollections {
    /// Create empty collections backed by `store`.
    #[must_use]
    pub const fn new(store: KeyValueStore) -> Self {
        Self {
            store,
            cart: KeyedCollection::new(),
            wishlist: KeyedCollection::new(),
        }
    }

    /// Restore both collections from their snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error only on store I/O failure; absent or corrupt
    /// snapshots rehydrate as empty.
    pub fn rehydrate(&mut self) -> Result<(), StoreError> {
        if let Some(entries) = self.store.get::<Vec<LineEntry>>(StoreKey::CartSnapshot)? {
            self.cart = KeyedCollection::from_entries(entries);
        }
        if let Some(entries) = self
            .store
            .get::<Vec<WishlistEntry>>(StoreKey::WishlistSnapshot)?
        {
            self.wishlist = KeyedCollection::from_entries(entries);
        }
        Ok(())
    }

    /// Dispatch a cart command. Returns the resulting quantity for the
    /// touched line (0 after a removal).
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    pub fn apply_cart(&mut self, command: CartCommand) -> Result<u32, StoreError> {
        match command {
            CartCommand::Add(entry) => self.cart_add(entry),
            CartCommand::Remove(key) => {
                self.cart_remove(&key)?;
                Ok(0)
            }
            CartCommand::SetQuantity { key, quantity } => self.cart_set_quantity(&key, quantity),
        }
    }

    /// Dispatch a wishlist command.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    pub fn apply_wishlist(&mut self, command: WishlistCommand) -> Result<(), StoreError> {
        match command {
            WishlistCommand::Add(entry) => {
                self.wishlist_add(entry)?;
            }
            WishlistCommand::Remove(id) => self.wishlist_remove(&id)?,
        }
        Ok(())
    }

    /// Add a line to the cart, merging by identity key.
    ///
    /// Returns the line's resulting quantity so the caller can report
    /// "now N in cart".
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    #[instrument(skip(self, entry), fields(product = %entry.product_id))]
    pub fn cart_add(&mut self, entry: LineEntry) -> Result<u32, StoreError> {
        let quantity = self.cart.add(entry);
        self.persist_cart()?;
        Ok(quantity)
    }

    /// Remove a cart line. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    pub fn cart_remove(&mut self, key: &LineKey) -> Result<(), StoreError> {
        if self.cart.remove(key) {
            self.persist_cart()?;
        }
        Ok(())
    }

    /// Set a cart line's quantity, clamped to `[1, 10]`.
    ///
    /// A requested quantity below 1 removes the line. Returns the resulting
    /// quantity (0 after a removal).
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    pub fn cart_set_quantity(&mut self, key: &LineKey, quantity: u32) -> Result<u32, StoreError> {
        if quantity < 1 {
            self.cart_remove(key)?;
            return Ok(0);
        }

        let clamped = quantity.min(MAX_LINE_QUANTITY);
        let Some(entry) = self.cart.get_mut(key) else {
            return Ok(0);
        };
        entry.quantity = clamped;
        self.persist_cart()?;
        Ok(clamped)
    }

    /// Add a product to the wishlist. Duplicate adds are no-ops.
    ///
    /// Returns `true` if the entry was new.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    #[instrument(skip(self, entry), fields(product = %entry.product_id))]
    pub fn wishlist_add(&mut self, entry: WishlistEntry) -> Result<bool, StoreError> {
        let key = CollectionEntry::key(&entry);
        let was_new = !self.wishlist.contains(&key);
        self.wishlist.add(entry);
        if was_new {
            self.persist_wishlist()?;
        }
        Ok(was_new)
    }

    /// Remove a product from the wishlist. Absent keys are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted.
    pub fn wishlist_remove(&mut self, id: &ProductId) -> Result<(), StoreError> {
        if self.wishlist.remove(id) {
            self.persist_wishlist()?;
        }
        Ok(())
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn cart_entries(&self) -> &[LineEntry] {
        self.cart.entries()
    }

    /// Wishlist entries in insertion order.
    #[must_use]
    pub fn wishlist_entries(&self) -> &[WishlistEntry] {
        self.wishlist.entries()
    }

    /// Total number of items in the cart (sum of line quantities).
    ///
    /// Recomputed on every call; never incrementally cached.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.cart.entries().iter().map(|e| e.quantity).sum()
    }

    /// Total cart price (sum of `price × quantity`).
    ///
    /// Recomputed on every call; never incrementally cached.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.cart
            .entries()
            .iter()
            .map(|e| e.price.times(e.quantity))
            .sum()
    }

    /// Write both snapshots out, whether or not anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if either snapshot cannot be persisted.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.persist_cart()?;
        self.persist_wishlist()
    }

    fn persist_cart(&self) -> Result<(), StoreError> {
        self.store.put(StoreKey::CartSnapshot, &self.cart.entries())
    }

    fn persist_wishlist(&self) -> Result<(), StoreError> {
        self.store
            .put(StoreKey::WishlistSnapshot, &self.wishlist.entries())
    }
}
