//! Core types for the Accord permissioned ledger.
//!
//! This crate provides the foundational types used throughout the node:
//!
//! - **Identifiers**: account/asset id parsing (`name@domain`, `name#domain`)
//! - **Amount**: 256-bit fixed-point decimal with checked arithmetic
//! - **Permissions**: role and grantable permission sets as fixed-width bitstrings
//! - **Crypto primitives**: hashes, keypairs, signatures
//! - **Consensus types**: rounds, vote messages, outcomes, peers, ledger state
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend on
//! any other workspace crates, making it the foundation layer.

mod amount;
mod consensus;
mod crypto;
mod identifier;
mod permissions;

pub use amount::{Amount, AmountError};
pub use consensus::{
    vote_signing_message, Answer, CommitMessage, FutureMessage, LedgerState, Peer, RejectMessage,
    Round, TopBlockInfo, VoteHashes, VoteMessage, YacHash, DOMAIN_VOTE,
};
pub use crypto::{Hash, KeyPair, PublicKey, Signature, HASH_LENGTH};
pub use identifier::{
    domain_of, make_account_id, make_asset_id, parse_two_part, split_id, IdError,
    ACCOUNT_DELIMITER, ASSET_DELIMITER,
};
pub use permissions::{
    permission_for, GrantablePermission, GrantablePermissionSet, Permission, PermissionParseError,
    PermissionSet, RolePermission, RolePermissionSet,
};

/// Test utilities.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;

    /// Create a deterministic keypair from a seed byte.
    pub fn test_keypair(seed: u8) -> KeyPair {
        KeyPair::from_seed(&[seed; 32])
    }

    /// Create a peer whose identity is derived from a seed byte.
    pub fn test_peer(seed: u8) -> Peer {
        Peer {
            address: format!("127.0.0.1:{}", 10_000 + u16::from(seed)),
            public_key: test_keypair(seed).public_key(),
        }
    }
}
