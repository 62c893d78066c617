//! Per-round aggregation of competing hashes.

use crate::storage::block_storage::BlockStorage;
use crate::supermajority::SupermajorityChecker;
use accord_types::{Answer, Peer, RejectMessage, Round, VoteMessage};
use std::sync::Arc;
use tracing::info;

/// Aggregates [`BlockStorage`] entries for every hash observed in one round.
///
/// Routes each incoming vote to the storage keyed by its hash, creating it
/// lazily. Emits [`Answer::Reject`] once the vote distribution proves that no
/// hash can reach supermajority even if every remaining peer votes for it.
pub struct ProposalStorage {
    round: Round,
    peers: Vec<Peer>,
    block_storages: Vec<BlockStorage>,
    supermajority_checker: Arc<dyn SupermajorityChecker>,
}

impl ProposalStorage {
    pub fn new(
        round: Round,
        peers: Vec<Peer>,
        supermajority_checker: Arc<dyn SupermajorityChecker>,
    ) -> Self {
        Self {
            round,
            peers,
            block_storages: Vec::new(),
            supermajority_checker,
        }
    }

    pub fn round(&self) -> Round {
        self.round
    }

    /// Insert a batch of votes atomically; the first produced outcome wins.
    pub fn insert(&mut self, votes: Vec<VoteMessage>) -> Option<Answer> {
        let mut answer = None;
        for vote in votes {
            let outcome = self.insert_one(vote);
            if answer.is_none() {
                answer = outcome;
            }
        }
        answer
    }

    /// Current outcome of the round, if any storage has one.
    pub fn state(&self) -> Option<Answer> {
        self.block_storages.iter().find_map(BlockStorage::state)
    }

    fn insert_one(&mut self, vote: VoteMessage) -> Option<Answer> {
        if vote.round() != self.round {
            return None;
        }

        let storage = self.storage_for(&vote);
        if let Some(commit) = storage.insert(vote) {
            return Some(commit);
        }
        self.reject_proof()
    }

    fn storage_for(&mut self, vote: &VoteMessage) -> &mut BlockStorage {
        let index = self
            .block_storages
            .iter()
            .position(|storage| storage.storage_key() == &vote.hash)
            .unwrap_or_else(|| {
                self.block_storages.push(BlockStorage::new(
                    vote.hash.clone(),
                    self.peers.clone(),
                    Arc::clone(&self.supermajority_checker),
                ));
                self.block_storages.len() - 1
            });
        &mut self.block_storages[index]
    }

    /// Reject once even the best candidate plus every silent peer falls short.
    fn reject_proof(&self) -> Option<Answer> {
        let voted: usize = self.block_storages.iter().map(BlockStorage::vote_count).sum();
        let frequent = self
            .block_storages
            .iter()
            .map(BlockStorage::vote_count)
            .max()
            .unwrap_or(0);

        if self
            .supermajority_checker
            .can_have_supermajority(frequent, voted, self.peers.len())
        {
            return None;
        }

        info!(round = %self.round, voted, frequent, "no hash can reach supermajority");
        let votes = self
            .block_storages
            .iter()
            .flat_map(|storage| storage.votes().iter().cloned())
            .collect();
        Some(Answer::Reject(RejectMessage { votes }))
    }
}
