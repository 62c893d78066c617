//! RocksDB-backed world state.
//!
//! Hosts the executor's [`StateTransaction`] contract on a RocksDB
//! `TransactionDB`: every ledger transaction is a pessimistic RocksDB
//! transaction whose reads see its own writes, with commit and rollback in
//! the caller's hands. All operations are synchronous blocking I/O.

use accord_executor::{StateError, StateIterator, StateTransaction};
use rocksdb::{Options, Transaction, TransactionDB, TransactionDBOptions};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors from opening or finishing transactions.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),
}

fn backend(error: rocksdb::Error) -> StateError {
    StateError::Backend(error.to_string())
}

/// A RocksDB world-state database.
pub struct LedgerDb {
    db: TransactionDB,
}

impl LedgerDb {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let txn_opts = TransactionDBOptions::default();
        let db = TransactionDB::open(&opts, &txn_opts, path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened world-state database");
        Ok(Self { db })
    }

    /// Begin a transaction. Reads see the transaction's own writes.
    pub fn transaction(&self) -> LedgerTransaction<'_> {
        LedgerTransaction {
            inner: self.db.transaction(),
        }
    }
}

/// One snapshot-isolated transaction over the world state.
pub struct LedgerTransaction<'db> {
    inner: Transaction<'db, TransactionDB>,
}

impl<'db> LedgerTransaction<'db> {
    /// Apply all buffered writes.
    pub fn commit(self) -> Result<(), StorageError> {
        self.inner.commit()?;
        Ok(())
    }

    /// Discard all buffered writes.
    pub fn rollback(self) -> Result<(), StorageError> {
        self.inner.rollback()?;
        Ok(())
    }
}

impl<'db> StateTransaction for LedgerTransaction<'db> {
    type Iter<'a>
        = LedgerIterator<'a, 'db>
    where
        Self: 'a;

    fn get(&self, key: &str, value: &mut String) -> Result<bool, StateError> {
        value.clear();
        match self.inner.get(key.as_bytes()).map_err(backend)? {
            Some(bytes) => {
                let text = std::str::from_utf8(&bytes)
                    .map_err(|_| StateError::Encoding(key.to_owned()))?;
                value.push_str(text);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StateError> {
        self.inner
            .put(key.as_bytes(), value.as_bytes())
            .map_err(backend)
    }

    fn del(&mut self, key: &str) -> Result<(), StateError> {
        self.inner.delete(key.as_bytes()).map_err(backend)
    }

    fn seek(&self, key: &str) -> Result<Self::Iter<'_>, StateError> {
        let mut inner = self.inner.raw_iterator();
        inner.seek(key.as_bytes());
        let mut iter = LedgerIterator {
            inner,
            current: None,
            decode_error: None,
        };
        iter.refresh()?;
        Ok(iter)
    }
}

/// Raw-iterator wrapper decoding keys and values to UTF-8 per position.
pub struct LedgerIterator<'a, 'db> {
    inner: rocksdb::DBRawIteratorWithThreadMode<'a, Transaction<'db, TransactionDB>>,
    current: Option<(String, String)>,
    decode_error: Option<StateError>,
}

impl<'a, 'db> LedgerIterator<'a, 'db> {
    fn refresh(&mut self) -> Result<(), StateError> {
        self.current = None;
        if !self.inner.valid() {
            return Ok(());
        }
        let (Some(key), Some(value)) = (self.inner.key(), self.inner.value()) else {
            return Ok(());
        };
        let key = std::str::from_utf8(key)
            .map_err(|_| StateError::Encoding(String::from_utf8_lossy(key).into_owned()))?
            .to_owned();
        let value = std::str::from_utf8(value)
            .map_err(|_| StateError::Encoding(key.clone()))?
            .to_owned();
        self.current = Some((key, value));
        Ok(())
    }
}

impl<'a, 'db> StateIterator for LedgerIterator<'a, 'db> {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &str {
        self.current.as_ref().map_or("", |(key, _)| key)
    }

    fn value(&self) -> &str {
        self.current.as_ref().map_or("", |(_, value)| value)
    }

    fn advance(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.inner.next();
        // A decoding failure parks the iterator; status() reports it.
        if let Err(error) = self.refresh() {
            self.current = None;
            self.decode_error = Some(error);
        }
    }

    fn status(&self) -> Result<(), StateError> {
        if let Some(error) = &self.decode_error {
            return Err(error.clone());
        }
        self.inner.status().map_err(backend)
    }
}
