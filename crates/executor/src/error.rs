//! Error taxonomy for the command and query executors.
//!
//! Numeric codes are wire-visible and must stay stable:
//! command code `1` is duplicate/KV failure, `2` is insufficient permission,
//! `3..=8` are command-specific semantic failures, `100` is not-implemented.

use accord_types::Hash;
use thiserror::Error;

/// Not-implemented command code.
pub const NOT_IMPLEMENTED: u32 = 100;

/// A failed command, to be rolled back by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command {command} failed with code {error_code}: {error_extra}")]
pub struct CommandError {
    /// Name of the failed command.
    pub command: &'static str,
    /// Stable numeric code.
    pub error_code: u32,
    /// Free-form diagnostic detail.
    pub error_extra: String,
}

impl CommandError {
    pub fn new(command: &'static str, error_code: u32, error_extra: impl Into<String>) -> Self {
        Self {
            command,
            error_code,
            error_extra: error_extra.into(),
        }
    }
}

/// Result of executing one command.
pub type CommandResult = Result<(), CommandError>;

/// Query error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorType {
    NoAccount,
    NoSignatories,
    NoRoles,
    StatefulFailed,
    NotSupported,
}

/// A failed query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query failed ({error_type:?}, code {code}): {detail}")]
pub struct QueryError {
    pub error_type: QueryErrorType,
    pub detail: String,
    pub code: u32,
    /// Hash of the query this error answers.
    pub query_hash: Hash,
}

impl QueryError {
    pub fn new(
        error_type: QueryErrorType,
        detail: impl Into<String>,
        code: u32,
        query_hash: Hash,
    ) -> Self {
        Self {
            error_type,
            detail: detail.into(),
            code,
            query_hash,
        }
    }
}
