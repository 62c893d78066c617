//! Access façade over a state transaction.
//!
//! [`StateCommon`] owns two scratch buffers (key and value) so the hot
//! command path formats keys and stages values without per-call allocation,
//! and exposes `get`/`put`/`del`/`seek` keyed by [`std::fmt::Arguments`]
//! produced by the `key_*!` macros below.

use crate::store::{StateError, StateIterator, StateTransaction};
use std::fmt::{self, Write as _};

// ═══════════════════════════════════════════════════════════════════════════
// Key grammar (bit-stable; delimiter is `/`)
// ═══════════════════════════════════════════════════════════════════════════

/// `quorum/{domain}/{account}` → decimal quorum
#[macro_export]
macro_rules! key_quorum {
    ($domain:expr, $account:expr) => {
        format_args!("quorum/{}/{}", $domain, $account)
    };
}

/// `account_role/{domain}/{account}/{role}` → role permission bitstring
#[macro_export]
macro_rules! key_account_role {
    ($domain:expr, $account:expr, $role:expr) => {
        format_args!("account_role/{}/{}/{}", $domain, $account, $role)
    };
}

/// `role/{role}` → permission bitstring
#[macro_export]
macro_rules! key_role {
    ($role:expr) => {
        format_args!("role/{}", $role)
    };
}

/// `domain/{domain}` → default role name
#[macro_export]
macro_rules! key_domain {
    ($domain:expr) => {
        format_args!("domain/{}", $domain)
    };
}

/// `signatory/{domain}/{account}/{pubkey}` → empty
#[macro_export]
macro_rules! key_signatory {
    ($domain:expr, $account:expr, $pubkey:expr) => {
        format_args!("signatory/{}/{}/{}", $domain, $account, $pubkey)
    };
}

/// `asset/{domain}/{asset}` → decimal precision
#[macro_export]
macro_rules! key_asset {
    ($domain:expr, $asset:expr) => {
        format_args!("asset/{}/{}", $domain, $asset)
    };
}

/// `account_asset/{domain}/{account}/{asset_id}` → amount string
#[macro_export]
macro_rules! key_account_asset {
    ($domain:expr, $account:expr, $asset_id:expr) => {
        format_args!("account_asset/{}/{}/{}", $domain, $account, $asset_id)
    };
}

/// `account_asset_size/{domain}/{account}` → decimal entry count
#[macro_export]
macro_rules! key_account_asset_size {
    ($domain:expr, $account:expr) => {
        format_args!("account_asset_size/{}/{}", $domain, $account)
    };
}

/// `account_detail/{domain}/{account}/{writer_domain}/{writer_account}/{key}` → value
#[macro_export]
macro_rules! key_account_detail {
    ($domain:expr, $account:expr, $writer_domain:expr, $writer_account:expr, $key:expr) => {
        format_args!(
            "account_detail/{}/{}/{}/{}/{}",
            $domain, $account, $writer_domain, $writer_account, $key
        )
    };
}

/// `peer/{pubkey}` → address
#[macro_export]
macro_rules! key_peer {
    ($pubkey:expr) => {
        format_args!("peer/{}", $pubkey)
    };
}

/// `permissions/{domain}/{account}` → effective permission bitstring
#[macro_export]
macro_rules! key_permissions {
    ($domain:expr, $account:expr) => {
        format_args!("permissions/{}/{}", $domain, $account)
    };
}

/// `granted/{grantee_domain}/{grantee_account}/{owner_domain}/{owner_account}`
/// → grantable permission bitstring
///
/// Grantee first: the account *exercising* the capability, then the account
/// whose "my" the capability refers to.
#[macro_export]
macro_rules! key_granted {
    ($grantee_domain:expr, $grantee_account:expr, $owner_domain:expr, $owner_account:expr) => {
        format_args!(
            "granted/{}/{}/{}/{}",
            $grantee_domain, $grantee_account, $owner_domain, $owner_account
        )
    };
}

/// `setting/{key}` → value
#[macro_export]
macro_rules! key_setting {
    ($key:expr) => {
        format_args!("setting/{}", $key)
    };
}

/// Settings key bounding transfer description length.
pub const MAX_DESCRIPTION_SIZE_KEY: &str = "max_description_size";

// ═══════════════════════════════════════════════════════════════════════════
// Façade
// ═══════════════════════════════════════════════════════════════════════════

/// Scratch-buffered access to one state transaction.
pub struct StateCommon<'t, T: StateTransaction> {
    tx: &'t mut T,
    key_buf: String,
    value_buf: String,
}

impl<'t, T: StateTransaction> StateCommon<'t, T> {
    pub fn new(tx: &'t mut T) -> Self {
        Self {
            tx,
            key_buf: String::new(),
            value_buf: String::new(),
        }
    }

    fn format_key(&mut self, key: fmt::Arguments<'_>) {
        self.key_buf.clear();
        // Writing into a String cannot fail.
        let _ = self.key_buf.write_fmt(key);
    }

    /// Read into the value buffer. Returns whether the key was found.
    pub fn get(&mut self, key: fmt::Arguments<'_>) -> Result<bool, StateError> {
        self.format_key(key);
        self.tx.get(&self.key_buf, &mut self.value_buf)
    }

    /// Write the value buffer under `key`.
    pub fn put(&mut self, key: fmt::Arguments<'_>) -> Result<(), StateError> {
        self.format_key(key);
        self.tx.put(&self.key_buf, &self.value_buf)
    }

    /// Delete `key`.
    pub fn del(&mut self, key: fmt::Arguments<'_>) -> Result<(), StateError> {
        self.format_key(key);
        self.tx.del(&self.key_buf)
    }

    /// Scan all keys under `prefix`.
    pub fn seek(&mut self, prefix: fmt::Arguments<'_>) -> Result<PrefixScan<T::Iter<'_>>, StateError> {
        self.seek_from(prefix, "")
    }

    /// Scan keys under `prefix`, starting at `prefix + start`.
    pub fn seek_from(
        &mut self,
        prefix: fmt::Arguments<'_>,
        start: &str,
    ) -> Result<PrefixScan<T::Iter<'_>>, StateError> {
        self.format_key(prefix);
        let prefix = self.key_buf.clone();
        self.key_buf.push_str(start);
        let iter = self.tx.seek(&self.key_buf)?;
        Ok(PrefixScan { iter, prefix })
    }

    /// Current value buffer contents.
    pub fn value(&self) -> &str {
        &self.value_buf
    }

    /// Stage a value for the next `put`.
    pub fn set_value(&mut self, value: &str) {
        self.value_buf.clear();
        self.value_buf.push_str(value);
    }

    /// Stage a number, ASCII decimal.
    pub fn encode_u64(&mut self, number: u64) {
        self.value_buf.clear();
        let _ = write!(self.value_buf, "{number}");
    }

    /// Parse the value buffer as ASCII decimal.
    pub fn decode_u64(&self) -> Result<u64, StateError> {
        self.value_buf
            .parse()
            .map_err(|_| StateError::Numeric(self.value_buf.clone()))
    }
}

/// An iterator bounded to a key prefix.
pub struct PrefixScan<I: StateIterator> {
    iter: I,
    prefix: String,
}

impl<I: StateIterator> PrefixScan<I> {
    pub fn valid(&self) -> bool {
        self.iter.valid() && self.iter.key().starts_with(&self.prefix)
    }

    /// Key with the scan prefix stripped.
    pub fn suffix(&self) -> &str {
        &self.iter.key()[self.prefix.len()..]
    }

    pub fn value(&self) -> &str {
        self.iter.value()
    }

    pub fn advance(&mut self) {
        self.iter.advance();
    }

    pub fn status(&self) -> Result<(), StateError> {
        self.iter.status()
    }
}
