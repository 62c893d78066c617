//! Consensus vote model: rounds, hashes, votes, outcomes, peers.

use crate::crypto::{PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain separation tag for vote signatures.
pub const DOMAIN_VOTE: &[u8] = b"yac_vote:";

/// A single voting attempt at a single height.
///
/// Ordering is lexicographic: `block_round` first, then `reject_round`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Round {
    pub block_round: u64,
    pub reject_round: u64,
}

impl Round {
    pub fn new(block_round: u64, reject_round: u64) -> Self {
        Self {
            block_round,
            reject_round,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block_round, self.reject_round)
    }
}

/// The proposal and block digests a vote commits to.
///
/// Both are empty for a "none" vote cast when a round looks frozen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct VoteHashes {
    pub proposal_hash: String,
    pub block_hash: String,
}

/// The consensus-level identifier of a candidate block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YacHash {
    pub vote_round: Round,
    pub vote_hashes: VoteHashes,
    /// Signature over the candidate block itself, carried alongside the vote.
    pub block_signature: Option<Signature>,
}

impl YacHash {
    pub fn new(vote_round: Round, proposal_hash: impl Into<String>, block_hash: impl Into<String>) -> Self {
        Self {
            vote_round,
            vote_hashes: VoteHashes {
                proposal_hash: proposal_hash.into(),
                block_hash: block_hash.into(),
            },
            block_signature: None,
        }
    }
}

/// A signed vote for one candidate hash at one round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteMessage {
    pub hash: YacHash,
    pub signature: Signature,
}

impl VoteMessage {
    pub fn round(&self) -> Round {
        self.hash.vote_round
    }
}

/// Message bytes signed for a vote, with domain separation.
///
/// Hash fields are length-prefixed so distinct `(proposal, block)` pairs can
/// never serialize to the same bytes.
pub fn vote_signing_message(hash: &YacHash) -> Vec<u8> {
    let proposal = hash.vote_hashes.proposal_hash.as_bytes();
    let block = hash.vote_hashes.block_hash.as_bytes();
    let mut message =
        Vec::with_capacity(DOMAIN_VOTE.len() + 32 + proposal.len() + block.len());
    message.extend_from_slice(DOMAIN_VOTE);
    message.extend_from_slice(&hash.vote_round.block_round.to_le_bytes());
    message.extend_from_slice(&hash.vote_round.reject_round.to_le_bytes());
    message.extend_from_slice(&(proposal.len() as u64).to_le_bytes());
    message.extend_from_slice(proposal);
    message.extend_from_slice(&(block.len() as u64).to_le_bytes());
    message.extend_from_slice(block);
    message
}

/// A cluster member.
///
/// Identity is the public key: two peers compare equal iff their keys match,
/// regardless of address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    pub address: String,
    pub public_key: PublicKey,
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for Peer {}

impl std::hash::Hash for Peer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.public_key.hash(state);
    }
}

/// The committed chain tip as consensus sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopBlockInfo {
    pub height: u64,
    pub hash: String,
}

/// Committed height plus the current voter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub top_block_info: TopBlockInfo,
    pub ledger_peers: Vec<Peer>,
}

/// Supermajority agreement on one hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    pub votes: Vec<VoteMessage>,
}

/// Proof that no hash can reach supermajority in this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectMessage {
    pub votes: Vec<VoteMessage>,
}

/// Votes for a round ahead of our committed height, to be buffered by the
/// pipeline and replayed once we catch up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FutureMessage {
    pub votes: Vec<VoteMessage>,
}

/// Outcome surfaced by the consensus state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Commit(CommitMessage),
    Reject(RejectMessage),
    Future(FutureMessage),
}

impl Answer {
    pub fn votes(&self) -> &[VoteMessage] {
        match self {
            Answer::Commit(commit) => &commit.votes,
            Answer::Reject(reject) => &reject.votes,
            Answer::Future(future) => &future.votes,
        }
    }
}
