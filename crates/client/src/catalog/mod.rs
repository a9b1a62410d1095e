//! Product catalog: items, filter state, and the filter engine.
//!
//! The engine derives the displayed product sequence from a base catalog,
//! sidebar facet selections, deep-linked query parameters, free-text search,
//! a sort key, and a growing pagination window. See [`CatalogFilterEngine`].

mod engine;
mod link;

pub use engine::{CatalogFilterEngine, PAGE_SIZE};
pub use link::LinkQuery;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gilded_mango_core::{Price, ProductId};

/// An immutable catalog entry, as served by the admin collection API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub gender: String,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub price: Price,
    pub image: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_best_seller: bool,
}

/// Sort order for the displayed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortKey {
    /// Descending creation order.
    #[default]
    #[serde(rename = "newest")]
    Newest,
    /// Ascending price.
    #[serde(rename = "price-low")]
    PriceLow,
    /// Descending price.
    #[serde(rename = "price-high")]
    PriceHigh,
    /// Case-insensitive lexicographic by name.
    #[serde(rename = "alphabetical")]
    Alphabetical,
}

/// Inclusive price bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Price,
    pub max: Price,
}

impl PriceRange {
    /// Whether `price` falls inside the bound (inclusive on both ends).
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        self.min <= price && price <= self.max
    }
}

/// The sidebar facet selections, persisted verbatim on every change.
///
/// An empty facet array means "no constraint on this facet", never
/// "match nothing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub category: Vec<String>,
    pub brand: Vec<String>,
    /// Product kind, matched against the item name (e.g. "hoodie").
    pub kind: Vec<String>,
    pub gender: Vec<String>,
    pub color: Vec<String>,
    pub size: Vec<String>,
    pub price_range: Option<PriceRange>,
    pub sort_by: SortKey,
}

/// The closed set of filter mutations the view layer can dispatch.
#[derive(Debug, Clone)]
pub enum FilterCommand {
    SetCategories(Vec<String>),
    SetBrands(Vec<String>),
    SetKinds(Vec<String>),
    SetGenders(Vec<String>),
    SetColors(Vec<String>),
    SetSizes(Vec<String>),
    SetPriceRange(Option<PriceRange>),
    SetSort(SortKey),
    ClearAll,
}
