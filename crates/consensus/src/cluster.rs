//! Rotating peer order used to pick the leader of each voting attempt.

use accord_types::{Hash, Peer, YacHash};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Errors from cluster ordering construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("cluster ordering requires at least one peer")]
    Empty,
}

/// A finite, rotating sequence of peers.
///
/// `current_leader` is the head; `switch_to_next` advances the head, wrapping
/// around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOrdering {
    order: Vec<Peer>,
    current: usize,
}

impl ClusterOrdering {
    pub fn new(order: Vec<Peer>) -> Result<Self, ClusterError> {
        if order.is_empty() {
            return Err(ClusterError::Empty);
        }
        Ok(Self { order, current: 0 })
    }

    pub fn current_leader(&self) -> &Peer {
        &self.order[self.current]
    }

    pub fn switch_to_next(&mut self) {
        self.current = (self.current + 1) % self.order.len();
    }

    pub fn peers(&self) -> &[Peer] {
        &self.order
    }

    /// Number of peers in the ring; always at least one.
    pub fn len(&self) -> usize {
        self.order.len()
    }
}

/// Derives the peer ordering for one voting round.
///
/// The permutation is seeded by the candidate block hash, so every honest
/// peer derives the same leader schedule without further coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerOrderer;

impl PeerOrderer {
    pub fn ordering(&self, hash: &YacHash, peers: &[Peer]) -> Result<ClusterOrdering, ClusterError> {
        let seed = Hash::digest(hash.vote_hashes.block_hash.as_bytes());
        let mut rng = ChaCha8Rng::from_seed(*seed.as_bytes());
        let mut order = peers.to_vec();
        order.shuffle(&mut rng);
        ClusterOrdering::new(order)
    }
}
