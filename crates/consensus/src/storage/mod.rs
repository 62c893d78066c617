//! Vote storage: rounds, processing states, cleanup.

mod block_storage;
mod proposal_storage;

pub use block_storage::BlockStorage;
pub use proposal_storage::ProposalStorage;

use crate::supermajority::SupermajorityChecker;
use accord_types::{Answer, Peer, Round, VoteMessage};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Where one round stands in the propagate-then-surface ladder.
///
/// Transitions are strictly monotone and driven only by the state machine:
/// `NotSentNotProcessed → SentNotProcessed → SentProcessed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingState {
    /// Outcome neither broadcast nor surfaced.
    #[default]
    NotSentNotProcessed,
    /// Outcome broadcast to the cluster, not yet surfaced to the pipeline.
    SentNotProcessed,
    /// Outcome surfaced; later receipts only trigger back-propagation.
    SentProcessed,
}

impl ProcessingState {
    pub fn next(self) -> Self {
        match self {
            ProcessingState::NotSentNotProcessed => ProcessingState::SentNotProcessed,
            ProcessingState::SentNotProcessed | ProcessingState::SentProcessed => {
                ProcessingState::SentProcessed
            }
        }
    }
}

/// Bounds how many rounds of vote state are retained.
pub trait CleanupStrategy: Send {
    /// Record that `round` now has storage; returns rounds to evict.
    fn on_new_round(&mut self, round: Round) -> Vec<Round>;
}

/// Retains the most recent `depth` rounds, evicting strictly older ones.
#[derive(Debug)]
pub struct BufferedCleanupStrategy {
    depth: usize,
    rounds: BTreeSet<Round>,
}

impl BufferedCleanupStrategy {
    /// Default retention window.
    pub const DEFAULT_DEPTH: usize = 3;

    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            rounds: BTreeSet::new(),
        }
    }
}

impl Default for BufferedCleanupStrategy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEPTH)
    }
}

impl CleanupStrategy for BufferedCleanupStrategy {
    fn on_new_round(&mut self, round: Round) -> Vec<Round> {
        self.rounds.insert(round);
        let mut evicted = Vec::new();
        while self.rounds.len() > self.depth {
            let Some(oldest) = self.rounds.iter().next().copied() else {
                break;
            };
            self.rounds.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }
}

/// Round-indexed vote storage with processing states and cleanup.
pub struct VoteStorage {
    proposal_storages: HashMap<Round, ProposalStorage>,
    processing_states: HashMap<Round, ProcessingState>,
    finalized: HashMap<Round, Answer>,
    last_finalized: Option<Round>,
    cleanup: Box<dyn CleanupStrategy>,
    supermajority_checker: Arc<dyn SupermajorityChecker>,
}

impl VoteStorage {
    pub fn new(
        cleanup: Box<dyn CleanupStrategy>,
        supermajority_checker: Arc<dyn SupermajorityChecker>,
    ) -> Self {
        Self {
            proposal_storages: HashMap::new(),
            processing_states: HashMap::new(),
            finalized: HashMap::new(),
            last_finalized: None,
            cleanup,
            supermajority_checker,
        }
    }

    /// Insert all votes atomically; returns the round outcome if one exists
    /// after insertion. Votes are expected to share one round (the first
    /// vote's round is authoritative, foreign-round votes are ignored by the
    /// proposal storage).
    pub fn store(&mut self, votes: Vec<VoteMessage>, peers: &[Peer]) -> Option<Answer> {
        let round = votes.first()?.round();
        let answer = self.proposal_storage(round, peers).insert(votes);

        if let Some(answer) = &answer {
            self.finalized.insert(round, answer.clone());
            if self.last_finalized.map_or(true, |last| round > last) {
                self.last_finalized = Some(round);
            }
        }
        answer
    }

    /// Whether the round already has a finalized outcome.
    pub fn is_committed(&self, round: Round) -> bool {
        self.finalized.contains_key(&round)
    }

    /// Finalized outcome of `round`, if any.
    pub fn state(&self, round: Round) -> Option<&Answer> {
        self.finalized.get(&round)
    }

    /// Most recent finalized round.
    pub fn last_finalized_round(&self) -> Option<Round> {
        self.last_finalized
    }

    pub fn processing_state(&self, round: Round) -> ProcessingState {
        self.processing_states
            .get(&round)
            .copied()
            .unwrap_or_default()
    }

    /// Advance the round's processing state one step.
    pub fn next_processing_state(&mut self, round: Round) {
        let state = self.processing_state(round).next();
        self.processing_states.insert(round, state);
    }

    /// Drop the per-round vote state, e.g. to escape a stuck round.
    pub fn remove(&mut self, round: Round) {
        self.proposal_storages.remove(&round);
    }

    fn proposal_storage(&mut self, round: Round, peers: &[Peer]) -> &mut ProposalStorage {
        if !self.proposal_storages.contains_key(&round) {
            for evicted in self.cleanup.on_new_round(round) {
                if evicted == round {
                    continue;
                }
                debug!(round = %evicted, "evicting stale round");
                self.proposal_storages.remove(&evicted);
                self.processing_states.remove(&evicted);
                self.finalized.remove(&evicted);
            }
        }
        self.proposal_storages.entry(round).or_insert_with(|| {
            ProposalStorage::new(round, peers.to_vec(), Arc::clone(&self.supermajority_checker))
        })
    }
}
