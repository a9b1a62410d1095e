//! Persistent key/value store.
//!
//! The durable store behind the engine: one JSON file per key under a data
//! directory, the native rendition of origin-scoped browser storage. Absence
//! of a key is always "empty/default", never an error, and a corrupt file is
//! logged and treated as absent so a bad write can never wedge startup.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur accessing the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized.
    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The closed set of keys the engine persists.
///
/// Each key is namespaced to its own file and independently rehydratable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Live auth token (deleted on logout).
    AuthToken,
    /// Cached avatar data URI (deliberately preserved across logout).
    Avatar,
    /// Recently-issued search terms, most recent first.
    RecentSearches,
    /// Last-applied catalog filter set.
    FilterSnapshot,
    /// Cart line entries.
    CartSnapshot,
    /// Wishlist entries.
    WishlistSnapshot,
    /// Deferred cart intent awaiting authentication.
    CartIntent,
    /// Deferred wishlist intent awaiting authentication.
    WishlistIntent,
    /// Location to return to after authenticating.
    ReturnTo,
}

impl StoreKey {
    /// File name backing this key.
    const fn file_name(self) -> &'static str {
        match self {
            Self::AuthToken => "auth_token.json",
            Self::Avatar => "avatar.json",
            Self::RecentSearches => "recent_searches.json",
            Self::FilterSnapshot => "filter_snapshot.json",
            Self::CartSnapshot => "cart.json",
            Self::WishlistSnapshot => "wishlist.json",
            Self::CartIntent => "cart_intent.json",
            Self::WishlistIntent => "wishlist_intent.json",
            Self::ReturnTo => "return_to.json",
        }
    }
}

/// Durable key/value store scoped to one data directory.
///
/// Cheaply cloneable; all handles share the same directory.
#[derive(Clone)]
pub struct KeyValueStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    dir: PathBuf,
}

impl KeyValueStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            inner: Arc::new(StoreInner { dir }),
        })
    }

    /// Read and deserialize the value under `key`.
    ///
    /// An absent key yields `Ok(None)`. A file that fails to parse is logged
    /// and also yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures other than the file missing.
    pub fn get<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>, StoreError> {
        let path = self.path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = ?key, error = %e, "Corrupt store entry, treating as absent");
                Ok(None)
            }
        }
    }

    /// Serialize and durably write `value` under `key`, replacing any
    /// previous value.
    ///
    /// The write goes to a sibling temp file first and is renamed into place,
    /// so a crash mid-write leaves the old value intact.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the filesystem write fails.
    pub fn put<T: Serialize>(&self, key: StoreKey, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Delete the value under `key`. Removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error for I/O failures other than the file missing.
    pub fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read and delete the value under `key` in one step.
    ///
    /// Used by consumers with at-most-once semantics: the key is gone before
    /// the caller acts on the value.
    ///
    /// # Errors
    ///
    /// Returns an error for I/O failures other than the file missing.
    pub fn take<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>, StoreError> {
        let value = self.get(key)?;
        self.remove(key)?;
        Ok(value)
    }

    /// Whether a value is present under `key`.
    #[must_use]
    pub fn contains(&self, key: StoreKey) -> bool {
        self.path(key).exists()
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.inner.dir.join(key.file_name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, KeyValueStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyValueStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_absent_key_is_none() {
        let (_dir, store) = temp_store();
        let value: Option<String> = store.get(StoreKey::AuthToken).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (_dir, store) = temp_store();
        store
            .put(StoreKey::RecentSearches, &vec!["sneakers".to_string()])
            .unwrap();

        let value: Option<Vec<String>> = store.get(StoreKey::RecentSearches).unwrap();
        assert_eq!(value.unwrap(), vec!["sneakers".to_string()]);
    }

    #[test]
    fn test_put_overwrites() {
        let (_dir, store) = temp_store();
        store.put(StoreKey::ReturnTo, &"/shop").unwrap();
        store.put(StoreKey::ReturnTo, &"/product/p-1").unwrap();

        let value: Option<String> = store.get(StoreKey::ReturnTo).unwrap();
        assert_eq!(value.unwrap(), "/product/p-1");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, store) = temp_store();
        store.put(StoreKey::AuthToken, &"tok").unwrap();
        store.remove(StoreKey::AuthToken).unwrap();
        store.remove(StoreKey::AuthToken).unwrap();
        assert!(!store.contains(StoreKey::AuthToken));
    }

    #[test]
    fn test_take_consumes() {
        let (_dir, store) = temp_store();
        store.put(StoreKey::CartIntent, &42_u32).unwrap();

        let first: Option<u32> = store.take(StoreKey::CartIntent).unwrap();
        let second: Option<u32> = store.take(StoreKey::CartIntent).unwrap();
        assert_eq!(first, Some(42));
        assert!(second.is_none());
    }

    #[test]
    fn test_corrupt_entry_treated_as_absent() {
        let (dir, store) = temp_store();
        std::fs::write(dir.path().join("cart.json"), b"{not json").unwrap();

        let value: Option<Vec<String>> = store.get(StoreKey::CartSnapshot).unwrap();
        assert!(value.is_none());
    }
}
