//! Consensus wiring.
//!
//! Builds the state machine and its collaborators, then runs them on one
//! dispatch lane: a single tokio task owns the [`Yac`] instance and every
//! entry point (inbound network state, timer steps, vote requests, ledger
//! advances) arrives as a [`YacRequest`] on the lane channel. Within the
//! lane, operations are atomic with respect to each other.
//!
//! Construction order matters: the state machine is fully initialized before
//! the lane starts consuming requests, and teardown releases in reverse
//! (lane drains, then timer, then network).

use crate::cluster::PeerOrderer;
use crate::crypto::Ed25519CryptoProvider;
use crate::network::YacNetwork;
use crate::storage::{BufferedCleanupStrategy, VoteStorage};
use crate::supermajority::BftSupermajorityChecker;
use crate::timer::TokioStepTimer;
use crate::yac::{VotingStep, Yac};
use accord_types::{Answer, KeyPair, LedgerState, VoteMessage, YacHash};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Messages marshalled onto the consensus lane.
#[derive(Debug)]
pub enum YacRequest {
    /// Begin voting for a candidate hash.
    Vote(YacHash),
    /// Inbound vote bundle from the transport.
    State(Vec<VoteMessage>),
    /// The outer pipeline advanced the ledger.
    LedgerState(LedgerState),
    /// A scheduled voting attempt came due.
    Step(VotingStep),
    /// Shut the lane down.
    Stop,
}

/// Consensus configuration.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Delay between voting attempts.
    pub vote_delay: Duration,
    /// How many rounds of vote state to retain.
    pub cleanup_depth: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            vote_delay: Duration::from_millis(3000),
            cleanup_depth: BufferedCleanupStrategy::DEFAULT_DEPTH,
        }
    }
}

/// Handle to a running consensus instance.
///
/// The transport subscribes by forwarding inbound bundles to [`on_state`];
/// outcomes reach the callback passed at construction. Dropping the gate
/// without [`shutdown`](YacGate::shutdown) aborts the lane task.
pub struct YacGate {
    lane: mpsc::UnboundedSender<YacRequest>,
    task: Option<JoinHandle<()>>,
}

impl YacGate {
    /// Vote for a candidate hash; the leader schedule is derived from the
    /// hash and the current ledger peers.
    pub fn vote(&self, hash: YacHash) {
        self.send(YacRequest::Vote(hash));
    }

    /// Entry point for the transport's inbound state stream.
    pub fn on_state(&self, state: Vec<VoteMessage>) {
        self.send(YacRequest::State(state));
    }

    /// Notify consensus that the ledger advanced.
    pub fn process_ledger_state(&self, ledger_state: LedgerState) {
        self.send(YacRequest::LedgerState(ledger_state));
    }

    /// Stop the lane and release the network, then wait for the task.
    pub async fn shutdown(mut self) {
        self.send(YacRequest::Stop);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, request: YacRequest) {
        if self.lane.send(request).is_err() {
            warn!("consensus lane is gone, dropping request");
        }
    }
}

impl Drop for YacGate {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Construct and start consensus.
///
/// `network` is the injected transport client; `on_outcome` receives every
/// surfaced [`Answer`] (commits, rejects, and future-round bundles for the
/// pipeline to buffer).
pub fn init_consensus_gate(
    keypair: KeyPair,
    ledger_state: LedgerState,
    network: Arc<dyn YacNetwork>,
    config: ConsensusConfig,
    mut on_outcome: impl FnMut(Answer) + Send + 'static,
) -> YacGate {
    let (lane, mut requests) = mpsc::unbounded_channel();

    let timer = TokioStepTimer::new(config.vote_delay, lane.clone());
    let crypto = Ed25519CryptoProvider::new(keypair);
    let vote_storage = VoteStorage::new(
        Box::new(BufferedCleanupStrategy::new(config.cleanup_depth)),
        Arc::new(BftSupermajorityChecker),
    );
    let orderer = PeerOrderer;
    let mut yac = Yac::new(
        vote_storage,
        Arc::clone(&network),
        Box::new(crypto),
        Box::new(timer),
        ledger_state,
    );

    let task = tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            match request {
                YacRequest::Vote(hash) => match orderer.ordering(&hash, yac.ledger_peers()) {
                    Ok(order) => yac.vote(hash, order),
                    Err(e) => warn!(error = %e, "cannot derive a voting order"),
                },
                YacRequest::State(state) => {
                    if let Some(answer) = yac.on_state(state) {
                        on_outcome(answer);
                    }
                }
                YacRequest::LedgerState(ledger_state) => yac.process_ledger_state(ledger_state),
                YacRequest::Step(step) => yac.voting_step(step),
                YacRequest::Stop => {
                    debug!("consensus lane stopping");
                    yac.stop();
                    break;
                }
            }
        }
    });

    YacGate {
        lane,
        task: Some(task),
    }
}
