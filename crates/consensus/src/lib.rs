//! Leader-rotating vote-based consensus.
//!
//! Drives the cluster from one committed block height to the next, tolerant
//! of up to `⌊(n−1)/3⌋` faulty peers.
//!
//! # Architecture
//!
//! The state machine ([`Yac`]) is synchronous and deterministic; all I/O is
//! delegated to collaborators behind traits:
//!
//! - [`YacNetwork`]: fire-and-forget vote delivery
//! - [`StepTimer`]: reschedules the next voting attempt
//! - [`CryptoProvider`]: vote signing and verification
//!
//! The wiring ([`init_consensus_gate`]) runs the state machine on a single
//! dispatch lane (one tokio task); inbound network state, timer steps, vote
//! requests and ledger advances are all messages on that lane, so no locks
//! are needed inside the machine.
//!
//! # Protocol sketch
//!
//! 1. **Voting**: sign the candidate hash, send it to the current leader,
//!    rotate, retry after a delay. Every [`ROTATE_PERIOD`] attempts the round
//!    is declared frozen and the vote falls back to empty hashes.
//! 2. **Collection**: per-round storages count unique signed votes per
//!    candidate hash; a supermajority commits, a provably split round
//!    rejects.
//! 3. **Application**: the first node to observe an outcome broadcasts it,
//!    surfaces it to the pipeline exactly once, and replays it directly to
//!    lagging peers afterwards.

mod cluster;
mod crypto;
mod init;
mod network;
mod storage;
mod supermajority;
mod timer;
mod yac;

pub use cluster::{ClusterError, ClusterOrdering, PeerOrderer};
pub use crypto::{CryptoProvider, Ed25519CryptoProvider};
pub use init::{init_consensus_gate, ConsensusConfig, YacGate, YacRequest};
pub use network::{ChannelNetwork, YacNetwork};
pub use storage::{
    BlockStorage, BufferedCleanupStrategy, CleanupStrategy, ProcessingState, ProposalStorage,
    VoteStorage,
};
pub use supermajority::{supermajority_size, BftSupermajorityChecker, SupermajorityChecker};
pub use timer::{StepTimer, TokioStepTimer};
pub use yac::{VotingStep, Yac, ROTATE_PERIOD};
