//! The consensus network sink.

use accord_types::{Peer, VoteMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::trace;

/// Outbound side of the consensus transport.
///
/// `send_state` is fire-and-forget and must never block the consensus lane;
/// implementations post to an outbound queue. After `stop`, sends are
/// silently dropped.
pub trait YacNetwork: Send + Sync {
    fn send_state(&self, to: &Peer, state: Vec<VoteMessage>);
    fn stop(&self);
}

/// Channel-backed network: sends become `(peer, votes)` items on an
/// unbounded queue drained by the actual transport (or by a test).
pub struct ChannelNetwork {
    outbound: mpsc::UnboundedSender<(Peer, Vec<VoteMessage>)>,
    stopped: AtomicBool,
}

impl ChannelNetwork {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(Peer, Vec<VoteMessage>)>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound,
                stopped: AtomicBool::new(false),
            },
            rx,
        )
    }
}

impl YacNetwork for ChannelNetwork {
    fn send_state(&self, to: &Peer, state: Vec<VoteMessage>) {
        if self.stopped.load(Ordering::Acquire) {
            trace!(peer = %to.address, "network stopped, dropping outbound state");
            return;
        }
        // A closed receiver means the transport is gone; nothing to do.
        let _ = self.outbound.send((to.clone(), state));
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}
