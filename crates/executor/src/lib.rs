//! Deterministic command and query executors over the world-state keyspace.
//!
//! This crate is the replicated state machine of the ledger: a closed command
//! alphabet applied against a key-value store under a snapshot transaction,
//! plus the read-only query side. The storage engine itself is a collaborator
//! behind the [`StateTransaction`] contract; anything with snapshot-isolated
//! `get`/`put`/`del`/`seek` can host the state.
//!
//! # Architecture
//!
//! ```text
//! Command ─→ CommandExecutor ─→ StateCommon ─→ StateTransaction
//! Query   ─→ QueryExecutor  ─┘      (scratch-buffered key/value access)
//! ```
//!
//! Executors are single-threaded and scoped to one transaction; commit and
//! rollback belong to the caller. Any command failure leaves the transaction
//! dirty and the caller is expected to roll it back.

mod commands;
mod error;
pub mod kv;
mod queries;
mod store;

pub use commands::{Command, CommandExecutor};
pub use error::{CommandError, CommandResult, QueryError, QueryErrorType, NOT_IMPLEMENTED};
pub use kv::{PrefixScan, StateCommon, MAX_DESCRIPTION_SIZE_KEY};
pub use queries::{AccountAsset, AssetPagination, Query, QueryExecutor, QueryResponse, QueryResult};
pub use store::{StateError, StateIterator, StateTransaction};

#[cfg(any(test, feature = "test-utils"))]
pub use store::{MemoryStore, MemoryTransaction};
