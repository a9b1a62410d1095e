//! Deep-link query parameters.
//!
//! Navigation links into the catalog page carry a second filter channel:
//! `?category=...&brand=...&gender=...&product=...`. These only apply for a
//! dimension whose sidebar facet is empty (see
//! [`CatalogFilterEngine`](super::CatalogFilterEngine)), so a stale link
//! never overrides a deliberate sidebar choice.

use url::Url;

/// Query parameters carried by an inbound navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub gender: Option<String>,
    /// Product kind, matched against item names.
    pub product: Option<String>,
}

impl LinkQuery {
    /// Extract the known parameters from a full URL.
    ///
    /// Unknown parameters are ignored; a repeated parameter keeps its first
    /// value. Empty values count as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if `href` is not a valid URL.
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(href)?;
        let mut query = Self::default();

        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "category" => query.category.get_or_insert_with(|| value.to_string()),
                "brand" => query.brand.get_or_insert_with(|| value.to_string()),
                "gender" => query.gender.get_or_insert_with(|| value.to_string()),
                "product" => query.product.get_or_insert_with(|| value.to_string()),
                _ => continue,
            };
        }

        Ok(query)
    }

    /// Whether no parameter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.brand.is_none()
            && self.gender.is_none()
            && self.product.is_none()
    }
}
