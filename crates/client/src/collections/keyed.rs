//! The keyed-collection reducer shared by cart and wishlist.

/// An entry that can live in a [`KeyedCollection`].
pub trait CollectionEntry: Clone {
    /// The identity key deciding whether two entries are "the same line".
    type Key: PartialEq;

    /// This entry's identity key.
    fn key(&self) -> Self::Key;

    /// Merge an arriving duplicate into this entry; returns the resulting
    /// quantity.
    fn absorb(&mut self, incoming: Self) -> u32;

    /// Current quantity of this entry.
    fn quantity(&self) -> u32;
}

/// An ordered collection where no two entries share an identity key.
///
/// Entries keep insertion order; an arriving duplicate merges into the
/// existing entry instead of appending. Collections are small (a cart), so
/// lookups are linear scans.
#[derive(Debug, Clone)]
pub struct KeyedCollection<E> {
    entries: Vec<E>,
}

impl<E: CollectionEntry> KeyedCollection<E> {
    /// An empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a collection from already-deduplicated snapshot entries.
    ///
    /// Snapshot entries that do collide (a hand-edited file) merge on the
    /// way in, restoring the no-duplicate invariant.
    #[must_use]
    pub fn from_entries(entries: Vec<E>) -> Self {
        let mut collection = Self::new();
        for entry in entries {
            collection.add(entry);
        }
        collection
    }

    /// Add an entry, merging with an existing entry of the same key.
    ///
    /// Returns the resulting quantity of the touched entry.
    pub fn add(&mut self, entry: E) -> u32 {
        let key = entry.key();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key() == key) {
            existing.absorb(entry)
        } else {
            let quantity = entry.quantity();
            self.entries.push(entry);
            quantity
        }
    }

    /// Remove the entry under `key`; returns whether anything was removed.
    pub fn remove(&mut self, key: &E::Key) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key() != *key);
        self.entries.len() != before
    }

    /// Look up an entry by key.
    #[must_use]
    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.entries.iter().find(|e| e.key() == *key)
    }

    /// Mutable lookup by key.
    pub fn get_mut(&mut self, key: &E::Key) -> Option<&mut E> {
        self.entries.iter_mut().find(|e| e.key() == *key)
    }

    /// Whether an entry exists under `key`.
    #[must_use]
    pub fn contains(&self, key: &E::Key) -> bool {
        self.get(key).is_some()
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// Number of distinct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: CollectionEntry> Default for KeyedCollection<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        id: u8,
        count: u32,
    }

    impl CollectionEntry for Counter {
        type Key = u8;

        fn key(&self) -> u8 {
            self.id
        }

        fn absorb(&mut self, incoming: Self) -> u32 {
            self.count += incoming.count;
            self.count
        }

        fn quantity(&self) -> u32 {
            self.count
        }
    }

    #[test]
    fn test_add_merges_duplicates() {
        let mut c = KeyedCollection::new();
        assert_eq!(c.add(Counter { id: 1, count: 2 }), 2);
        assert_eq!(c.add(Counter { id: 1, count: 3 }), 5);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut c = KeyedCollection::new();
        c.add(Counter { id: 3, count: 1 });
        c.add(Counter { id: 1, count: 1 });
        c.add(Counter { id: 3, count: 1 });

        let ids: Vec<u8> = c.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut c = KeyedCollection::new();
        c.add(Counter { id: 1, count: 1 });
        assert!(c.remove(&1));
        assert!(!c.remove(&1));
        assert!(c.is_empty());
    }

    #[test]
    fn test_from_entries_restores_invariant() {
        let c = KeyedCollection::from_entries(vec![
            Counter { id: 1, count: 1 },
            Counter { id: 1, count: 2 },
        ]);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(&1).map(|e| e.count), Some(3));
    }
}
