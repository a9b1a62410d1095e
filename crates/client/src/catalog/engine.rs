//! The catalog filter engine.
//!
//! Derives the displayed product sequence from the base catalog and the two
//! filter channels (sidebar facets and deep-link parameters), then sorts and
//! paginates. Pure with respect to the catalog; the only I/O is persisting
//! the filter snapshot and recent search terms.

use tracing::debug;

use crate::store::{KeyValueStore, StoreError, StoreKey};

use super::{CatalogItem, FilterCommand, FilterState, LinkQuery, SortKey};

/// Initial pagination window, and the step it grows by.
pub const PAGE_SIZE: usize = 20;

/// How many recent search terms are kept.
const RECENT_SEARCH_CAP: usize = 8;

/// Catalog filtering, sorting, and pagination.
///
/// Precedence between the two input channels: a non-empty sidebar facet wins
/// outright for its dimension; the deep-link parameter for that dimension is
/// only consulted when the facet is empty.
pub struct CatalogFilterEngine {
    store: KeyValueStore,
    items: Vec<CatalogItem>,
    filters: FilterState,
    link: LinkQuery,
    search: Option<String>,
    visible_limit: usize,
}

impl CatalogFilterEngine {
    /// Create an engine with an empty catalog and default filters.
    #[must_use]
    pub const fn new(store: KeyValueStore) -> Self {
        Self {
            store,
            items: Vec::new(),
            filters: FilterState::default_const(),
            link: LinkQuery {
                category: None,
                brand: None,
                gender: None,
                product: None,
            },
            search: None,
            visible_limit: PAGE_SIZE,
        }
    }

    /// Restore the last-applied filter set from the persistent store.
    ///
    /// # Errors
    ///
    /// Returns an error only on store I/O failure; an absent or corrupt
    /// snapshot yields the defaults.
    pub fn rehydrate(&mut self) -> Result<(), StoreError> {
        if let Some(filters) = self.store.get::<FilterState>(StoreKey::FilterSnapshot)? {
            self.filters = filters;
        }
        Ok(())
    }

    /// Replace the base catalog.
    ///
    /// A new upstream sequence resets the pagination window.
    pub fn set_catalog(&mut self, items: Vec<CatalogItem>) {
        self.items = items;
        self.visible_limit = PAGE_SIZE;
    }

    /// Current facet selections.
    #[must_use]
    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Apply a filter mutation, persist the snapshot, and reset pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be persisted; the in-memory
    /// state is updated regardless.
    pub fn apply(&mut self, command: FilterCommand) -> Result<(), StoreError> {
        match command {
            FilterCommand::SetCategories(values) => self.filters.category = values,
            FilterCommand::SetBrands(values) => self.filters.brand = values,
            FilterCommand::SetKinds(values) => self.filters.kind = values,
            FilterCommand::SetGenders(values) => self.filters.gender = values,
            FilterCommand::SetColors(values) => self.filters.color = values,
            FilterCommand::SetSizes(values) => self.filters.size = values,
            FilterCommand::SetPriceRange(range) => self.filters.price_range = range,
            FilterCommand::SetSort(key) => self.filters.sort_by = key,
            FilterCommand::ClearAll => self.filters = FilterState::default(),
        }

        self.visible_limit = PAGE_SIZE;
        self.store.put(StoreKey::FilterSnapshot, &self.filters)
    }

    /// Install the query parameters of an inbound navigation link.
    ///
    /// A changed link resets the pagination window; re-installing the same
    /// link does not.
    pub fn set_link_query(&mut self, link: LinkQuery) {
        if self.link != link {
            self.link = link;
            self.visible_limit = PAGE_SIZE;
        }
    }

    /// Set or clear the free-text search term.
    ///
    /// A non-empty term is recorded to the recent-searches list.
    ///
    /// # Errors
    ///
    /// Returns an error if the recent-searches list cannot be persisted.
    pub fn set_search(&mut self, term: Option<String>) -> Result<(), StoreError> {
        let term = term.filter(|t| !t.trim().is_empty());
        if let Some(term) = &term {
            self.record_search(term)?;
        }
        self.search = term;
        self.visible_limit = PAGE_SIZE;
        Ok(())
    }

    /// Recently-issued search terms, most recent first.
    #[must_use]
    pub fn recent_searches(&self) -> Vec<String> {
        self.store
            .get::<Vec<String>>(StoreKey::RecentSearches)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    fn record_search(&self, term: &str) -> Result<(), StoreError> {
        let mut recent = self.recent_searches();
        recent.retain(|t| !t.eq_ignore_ascii_case(term));
        recent.insert(0, term.to_string());
        recent.truncate(RECENT_SEARCH_CAP);
        self.store.put(StoreKey::RecentSearches, &recent)
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    /// The filtered, sorted sequence with the pagination window applied.
    #[must_use]
    pub fn visible(&self) -> Vec<&CatalogItem> {
        let mut matched = self.matched();
        self.sort(&mut matched);
        matched.truncate(self.visible_limit);
        matched
    }

    /// How many items match the active constraints, ignoring pagination.
    #[must_use]
    pub fn matching_count(&self) -> usize {
        self.matched().len()
    }

    /// Grow the pagination window by one page.
    ///
    /// Never shrinks; a no-op once every matching item is already visible.
    pub fn load_more(&mut self) {
        if self.visible_limit < self.matching_count() {
            self.visible_limit += PAGE_SIZE;
            debug!(limit = self.visible_limit, "Grew catalog page window");
        }
    }

    /// Current pagination window size.
    #[must_use]
    pub const fn visible_limit(&self) -> usize {
        self.visible_limit
    }

    fn matched(&self) -> Vec<&CatalogItem> {
        self.items.iter().filter(|item| self.matches(item)).collect()
    }

    fn matches(&self, item: &CatalogItem) -> bool {
        // Sidebar facet wins outright for its dimension; the link parameter
        // is only consulted when the facet is empty.
        let category_ok = match_single(&self.filters.category, self.link.category.as_deref(), |c| {
            c.eq_ignore_ascii_case(&item.category)
        });
        let brand_ok = match_single(&self.filters.brand, self.link.brand.as_deref(), |b| {
            b.eq_ignore_ascii_case(&item.brand)
        });
        let gender_ok = match_single(&self.filters.gender, self.link.gender.as_deref(), |g| {
            g.eq_ignore_ascii_case(&item.gender)
        });
        let kind_ok = match_single(&self.filters.kind, self.link.product.as_deref(), |k| {
            contains_ignore_case(&item.name, k)
        });

        let color_ok = self.filters.color.is_empty()
            || item
                .colors
                .iter()
                .any(|c| self.filters.color.iter().any(|f| f.eq_ignore_ascii_case(c)));
        let size_ok = self.filters.size.is_empty()
            || item
                .sizes
                .iter()
                .any(|s| self.filters.size.iter().any(|f| f.eq_ignore_ascii_case(s)));

        let price_ok = self
            .filters
            .price_range
            .is_none_or(|range| range.contains(item.price));

        let search_ok = self.search.as_deref().is_none_or(|term| {
            contains_ignore_case(&item.name, term)
                || contains_ignore_case(&item.brand, term)
                || contains_ignore_case(&item.description, term)
        });

        category_ok && brand_ok && gender_ok && kind_ok && color_ok && size_ok && price_ok
            && search_ok
    }

    fn sort(&self, items: &mut [&CatalogItem]) {
        // Stable sorts throughout, so catalog insertion order breaks ties and
        // re-sorting an already-sorted sequence is a fixed point.
        match self.filters.sort_by {
            SortKey::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortKey::PriceLow => items.sort_by(|a, b| a.price.cmp(&b.price)),
            SortKey::PriceHigh => items.sort_by(|a, b| b.price.cmp(&a.price)),
            SortKey::Alphabetical => {
                items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            }
        }
    }
}

/// Membership test for one dimension across the two channels: the facet set
/// if non-empty, else the link parameter, else unconstrained.
fn match_single<'a>(
    facet: &'a [String],
    link: Option<&'a str>,
    mut test: impl FnMut(&str) -> bool,
) -> bool {
    if !facet.is_empty() {
        return facet.iter().any(|value| test(value));
    }
    link.is_none_or(test)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl FilterState {
    /// `Default::default()` is not const; this is, for `CatalogFilterEngine::new`.
    const fn default_const() -> Self {
        Self {
            category: Vec::new(),
            brand: Vec::new(),
            kind: Vec::new(),
            gender: Vec::new(),
            color: Vec::new(),
            size: Vec::new(),
            price_range: None,
            sort_by: SortKey::Newest,
        }
    }
}
