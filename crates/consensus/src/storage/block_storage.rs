//! Per-hash vote accumulation.

use crate::supermajority::SupermajorityChecker;
use accord_types::{Answer, CommitMessage, Peer, VoteMessage, YacHash};
use std::sync::Arc;
use tracing::{info, warn};

/// Collects votes for one specific hash at one round.
///
/// A vote is accepted iff the signer is in the current peer set, the vote's
/// hash matches the storage key, and the exact vote is not already present.
/// Emits a [`Answer::Commit`] once the accepted votes reach supermajority.
pub struct BlockStorage {
    storage_key: YacHash,
    peers: Vec<Peer>,
    votes: Vec<VoteMessage>,
    supermajority_checker: Arc<dyn SupermajorityChecker>,
}

impl BlockStorage {
    pub fn new(
        storage_key: YacHash,
        peers: Vec<Peer>,
        supermajority_checker: Arc<dyn SupermajorityChecker>,
    ) -> Self {
        Self {
            storage_key,
            peers,
            votes: Vec::new(),
            supermajority_checker,
        }
    }

    /// Insert one vote and report the storage state.
    pub fn insert(&mut self, vote: VoteMessage) -> Option<Answer> {
        if self.valid_scheme(&vote) && self.unique_vote(&vote) {
            self.votes.push(vote);
            info!(
                round = %self.storage_key.vote_round,
                proposal = %self.storage_key.vote_hashes.proposal_hash,
                block = %self.storage_key.vote_hashes.block_hash,
                votes = self.votes.len(),
                peers = self.peers.len(),
                "vote inserted"
            );
        }
        self.state()
    }

    /// Insert a batch of votes and report the storage state.
    pub fn insert_votes(&mut self, votes: Vec<VoteMessage>) -> Option<Answer> {
        for vote in votes {
            self.insert(vote);
        }
        self.state()
    }

    /// Commit outcome if the collected votes reach supermajority.
    pub fn state(&self) -> Option<Answer> {
        if self
            .supermajority_checker
            .has_supermajority(self.votes.len(), self.peers.len())
        {
            Some(Answer::Commit(CommitMessage {
                votes: self.votes.clone(),
            }))
        } else {
            None
        }
    }

    pub fn votes(&self) -> &[VoteMessage] {
        &self.votes
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn contains(&self, vote: &VoteMessage) -> bool {
        self.votes.contains(vote)
    }

    pub fn storage_key(&self) -> &YacHash {
        &self.storage_key
    }

    fn unique_vote(&self, vote: &VoteMessage) -> bool {
        !self.votes.contains(vote)
    }

    fn valid_scheme(&self, vote: &VoteMessage) -> bool {
        let known_peer = self
            .peers
            .iter()
            .any(|peer| &peer.public_key == vote.signature.public_key());
        if !known_peer {
            warn!(signer = %vote.signature.public_key(), "got a vote from an unknown peer");
        }
        known_peer && self.storage_key == vote.hash
    }
}
