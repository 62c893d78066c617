//! The YAC state machine.
//!
//! Synchronous and single-writer: all entry points (`vote`, `on_state`,
//! `voting_step`, `process_ledger_state`) are called from one dispatch lane
//! owned by the wiring (see `init`). Network sends are fire-and-forget and
//! the timer only posts the next voting step back onto the lane, so nothing
//! here blocks.

use crate::cluster::ClusterOrdering;
use crate::crypto::CryptoProvider;
use crate::network::YacNetwork;
use crate::storage::{ProcessingState, VoteStorage};
use crate::timer::StepTimer;
use accord_types::{Answer, FutureMessage, LedgerState, Peer, VoteMessage, YacHash};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Attempts between per-round storage resets; at this attempt the round is
/// considered frozen and the vote falls back to empty hashes.
pub const ROTATE_PERIOD: u32 = 10;

/// One scheduled voting attempt.
#[derive(Debug, Clone)]
pub struct VotingStep {
    pub vote: VoteMessage,
    pub order: ClusterOrdering,
    pub attempt: u32,
}

/// Drives vote propagation and outcome application for the local node.
pub struct Yac {
    ledger_state: LedgerState,
    vote_storage: VoteStorage,
    network: Arc<dyn YacNetwork>,
    crypto: Box<dyn CryptoProvider>,
    timer: Box<dyn StepTimer>,
}

impl Yac {
    pub fn new(
        vote_storage: VoteStorage,
        network: Arc<dyn YacNetwork>,
        crypto: Box<dyn CryptoProvider>,
        timer: Box<dyn StepTimer>,
        ledger_state: LedgerState,
    ) -> Self {
        Self {
            ledger_state,
            vote_storage,
            network,
            crypto,
            timer,
        }
    }

    /// Current voter set.
    pub fn ledger_peers(&self) -> &[Peer] {
        &self.ledger_state.ledger_peers
    }

    // ------ hash gate ------

    /// Begin voting for `hash` along `order`.
    pub fn vote(&mut self, hash: YacHash, order: ClusterOrdering) {
        info!(
            round = %hash.vote_round,
            order = ?order.peers().iter().map(|p| p.address.as_str()).collect::<Vec<_>>(),
            "order for voting"
        );
        let vote = self.crypto.get_vote(hash);
        self.voting_step(VotingStep {
            vote,
            order,
            attempt: 0,
        });
    }

    /// One voting attempt; reschedules itself through the timer.
    pub fn voting_step(&mut self, step: VotingStep) {
        let VotingStep {
            mut vote,
            mut order,
            attempt,
        } = step;
        let round = vote.round();

        if self.vote_storage.is_committed(round) {
            debug!(%round, "round already finalized, stopping the voting loop");
            return;
        }

        // Periodically drop the accumulated per-round votes to escape a
        // stuck situation.
        if attempt != 0 && attempt % ROTATE_PERIOD == 0 {
            self.vote_storage.remove(round);
        }

        // One full rotation without progress: the round is frozen. Vote for
        // an empty proposal so the cluster can converge on a reject.
        if attempt == ROTATE_PERIOD {
            let mut hash = vote.hash;
            hash.vote_hashes.proposal_hash.clear();
            hash.vote_hashes.block_hash.clear();
            hash.block_signature = None;
            vote = self.crypto.get_vote(hash);
        }

        let leader = order.current_leader().clone();
        info!(%round, attempt, leader = %leader.address, "sending vote");
        self.network.send_state(&leader, vec![vote.clone()]);
        order.switch_to_next();

        self.timer.invoke_after_delay(VotingStep {
            vote,
            order,
            attempt: attempt + 1,
        });
    }

    // ------ network notifications ------

    /// Handle an incoming vote bundle.
    pub fn on_state(&mut self, state: Vec<VoteMessage>) -> Option<Answer> {
        if !self.crypto.verify(&state) {
            warn!(
                votes = state.len(),
                "crypto verification failed for message"
            );
            return None;
        }

        let round = state[0].round();
        let height = self.ledger_state.top_block_info.height;

        if round.block_round > height {
            info!(%round, height, "passing state from the future to the pipeline");
            return Some(Answer::Future(FutureMessage { votes: state }));
        }
        if round.block_round < height {
            info!(%round, height, "state from the past, trying to propagate back");
            self.try_propagate_back(&state);
            return None;
        }

        self.apply_state(state)
    }

    /// Replace the ledger view; rounds below the new height become "past".
    pub fn process_ledger_state(&mut self, ledger_state: LedgerState) {
        self.ledger_state = ledger_state;
    }

    /// Release the network and silence pending timer callbacks.
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.network.stop();
    }

    // ------ apply data ------

    fn apply_state(&mut self, state: Vec<VoteMessage>) -> Option<Answer> {
        let round = state[0].round();
        let answer = self
            .vote_storage
            .store(state.clone(), &self.ledger_state.ledger_peers)?;

        // A multi-vote bundle means some peer already collected this outcome,
        // so our own broadcast would be redundant. The single-peer cluster
        // special case: our lone vote is the whole outcome.
        if state.len() > 1 || self.ledger_state.ledger_peers.len() == 1 {
            if self.vote_storage.processing_state(round) == ProcessingState::NotSentNotProcessed {
                self.vote_storage.next_processing_state(round);
                info!(%round, "supermajority received, skipping propagation");
            }
        }

        match self.vote_storage.processing_state(round) {
            ProcessingState::NotSentNotProcessed => {
                self.vote_storage.next_processing_state(round);
                info!(%round, "propagating outcome to the whole network");
                self.propagate_state(answer.votes());
                None
            }
            ProcessingState::SentNotProcessed => {
                self.vote_storage.next_processing_state(round);
                info!(%round, "passing outcome to the pipeline");
                Some(answer)
            }
            ProcessingState::SentProcessed => {
                self.try_propagate_back(&state);
                None
            }
        }
    }

    /// Resend the finalized outcome straight to a lagging sender.
    ///
    /// Only single-vote bundles qualify: a peer sending a full vote set has
    /// already finalized the round itself.
    fn try_propagate_back(&self, state: &[VoteMessage]) {
        if state.len() != 1 {
            return;
        }
        let Some(last_round) = self.vote_storage.last_finalized_round() else {
            return;
        };
        if state[0].round() > last_round {
            return;
        }
        let Some(answer) = self.vote_storage.state(last_round) else {
            return;
        };
        let Some(peer) = self.find_peer(&state[0]) else {
            return;
        };
        info!(round = %last_round, peer = %peer.address, "propagating finalized state directly");
        self.network.send_state(&peer, answer.votes().to_vec());
    }

    fn find_peer(&self, vote: &VoteMessage) -> Option<Peer> {
        self.ledger_state
            .ledger_peers
            .iter()
            .find(|peer| &peer.public_key == vote.signature.public_key())
            .cloned()
    }

    // ------ propagation ------

    fn propagate_state(&self, votes: &[VoteMessage]) {
        for peer in &self.ledger_state.ledger_peers {
            self.network.send_state(peer, votes.to_vec());
        }
    }
}
