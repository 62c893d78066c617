//! The key-value transaction contract the executors run against.
//!
//! The on-disk engine is a collaborator, not part of this crate: anything that
//! offers a snapshot-isolated transaction with `get`/`put`/`del` and an
//! ordered iterator can host the world state. Keys and values are UTF-8 text
//! (numeric values are ASCII decimal).
//!
//! Commit and abort belong to the caller; the executors only read and write
//! through the handle.

use thiserror::Error;

/// Errors surfaced by a state transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The backing engine failed.
    #[error("storage engine failure: {0}")]
    Backend(String),
    /// A stored value was not valid UTF-8.
    #[error("non-utf8 value at key `{0}`")]
    Encoding(String),
    /// A stored numeric value did not parse as ASCII decimal.
    #[error("malformed numeric value `{0}`")]
    Numeric(String),
}

/// An ordered iterator positioned by [`StateTransaction::seek`].
///
/// The iterator walks keys in ascending order starting at the seek position;
/// bounding the walk to a prefix is the caller's job.
pub trait StateIterator {
    /// Whether the iterator currently points at an entry.
    fn valid(&self) -> bool;

    /// Key at the current position. Only meaningful while [`valid`](Self::valid).
    fn key(&self) -> &str;

    /// Value at the current position. Only meaningful while [`valid`](Self::valid).
    fn value(&self) -> &str;

    /// Move to the next entry.
    fn advance(&mut self);

    /// Any error encountered while iterating.
    fn status(&self) -> Result<(), StateError>;
}

/// A snapshot-isolated transaction over the world-state keyspace.
pub trait StateTransaction {
    type Iter<'a>: StateIterator + 'a
    where
        Self: 'a;

    /// Read `key` into `value`. Returns whether the key was found.
    fn get(&self, key: &str, value: &mut String) -> Result<bool, StateError>;

    /// Write `key = value`.
    fn put(&mut self, key: &str, value: &str) -> Result<(), StateError>;

    /// Delete `key`. Deleting an absent key is not an error.
    fn del(&mut self, key: &str) -> Result<(), StateError>;

    /// Position an iterator at the first key `>= key`.
    fn seek(&self, key: &str) -> Result<Self::Iter<'_>, StateError>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryStore, MemoryTransaction};

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::{StateError, StateIterator, StateTransaction};
    use parking_lot::RwLock;
    use std::collections::BTreeMap;
    use std::ops::Bound;
    use std::sync::Arc;

    /// Shared in-memory world state for tests and local tooling.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        map: RwLock<BTreeMap<String, String>>,
    }

    impl MemoryStore {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Begin a transaction layered over the current state.
        pub fn transaction(self: &Arc<Self>) -> MemoryTransaction {
            MemoryTransaction {
                base: Arc::clone(self),
                overlay: BTreeMap::new(),
            }
        }

        /// Direct read of committed state, bypassing any transaction.
        pub fn committed(&self, key: &str) -> Option<String> {
            self.map.read().get(key).cloned()
        }

        pub fn len(&self) -> usize {
            self.map.read().len()
        }

        pub fn is_empty(&self) -> bool {
            self.map.read().is_empty()
        }
    }

    /// A buffered transaction: writes go to an overlay (`None` = tombstone)
    /// and only reach the base map on [`commit`](MemoryTransaction::commit).
    #[derive(Debug)]
    pub struct MemoryTransaction {
        base: Arc<MemoryStore>,
        overlay: BTreeMap<String, Option<String>>,
    }

    impl MemoryTransaction {
        /// Apply buffered writes to the shared store.
        pub fn commit(self) {
            let mut map = self.base.map.write();
            for (key, value) in self.overlay {
                match value {
                    Some(value) => {
                        map.insert(key, value);
                    }
                    None => {
                        map.remove(&key);
                    }
                }
            }
        }

        /// Discard buffered writes.
        pub fn rollback(self) {}
    }

    impl StateTransaction for MemoryTransaction {
        type Iter<'a> = MemoryIter;

        fn get(&self, key: &str, value: &mut String) -> Result<bool, StateError> {
            value.clear();
            match self.overlay.get(key) {
                Some(Some(buffered)) => {
                    value.push_str(buffered);
                    Ok(true)
                }
                Some(None) => Ok(false),
                None => match self.base.map.read().get(key) {
                    Some(committed) => {
                        value.push_str(committed);
                        Ok(true)
                    }
                    None => Ok(false),
                },
            }
        }

        fn put(&mut self, key: &str, value: &str) -> Result<(), StateError> {
            self.overlay.insert(key.to_owned(), Some(value.to_owned()));
            Ok(())
        }

        fn del(&mut self, key: &str) -> Result<(), StateError> {
            self.overlay.insert(key.to_owned(), None);
            Ok(())
        }

        fn seek(&self, key: &str) -> Result<Self::Iter<'_>, StateError> {
            // Merge the committed range with the overlay, tombstones winning.
            let range = (Bound::Included(key), Bound::Unbounded);
            let mut merged: BTreeMap<String, Option<String>> = self
                .base
                .map
                .read()
                .range::<str, _>(range)
                .map(|(k, v)| (k.clone(), Some(v.clone())))
                .collect();
            for (k, v) in self.overlay.range::<str, _>(range) {
                merged.insert(k.clone(), v.clone());
            }
            let entries = merged
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect();
            Ok(MemoryIter { entries, position: 0 })
        }
    }

    /// Materialized snapshot iterator over the merged view.
    #[derive(Debug)]
    pub struct MemoryIter {
        entries: Vec<(String, String)>,
        position: usize,
    }

    impl StateIterator for MemoryIter {
        fn valid(&self) -> bool {
            self.position < self.entries.len()
        }

        fn key(&self) -> &str {
            &self.entries[self.position].0
        }

        fn value(&self) -> &str {
            &self.entries[self.position].1
        }

        fn advance(&mut self) {
            self.position += 1;
        }

        fn status(&self) -> Result<(), StateError> {
            Ok(())
        }
    }

}
