//! Single-shot voting-step timer.
//!
//! The timer never calls back into the state machine directly: it posts the
//! next [`VotingStep`] onto the consensus lane, which processes it like any
//! other message. Cancellation is best-effort; a step that fires anyway is
//! harmless because the voting step re-checks round finalization first.

use crate::init::YacRequest;
use crate::yac::VotingStep;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Schedules the next voting attempt. Single-shot: arming replaces any
/// pending attempt.
pub trait StepTimer: Send {
    fn invoke_after_delay(&mut self, step: VotingStep);
    fn cancel(&mut self);
}

/// Tokio-backed timer posting onto the consensus lane.
pub struct TokioStepTimer {
    delay: Duration,
    lane: mpsc::UnboundedSender<YacRequest>,
    pending: Option<JoinHandle<()>>,
}

impl TokioStepTimer {
    pub fn new(delay: Duration, lane: mpsc::UnboundedSender<YacRequest>) -> Self {
        Self {
            delay,
            lane,
            pending: None,
        }
    }
}

impl StepTimer for TokioStepTimer {
    fn invoke_after_delay(&mut self, step: VotingStep) {
        self.cancel();
        let lane = self.lane.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(attempt = step.attempt, "voting-step timer fired");
            // A closed lane means the gate is shutting down.
            let _ = lane.send(YacRequest::Step(step));
        }));
        debug!(delay = ?self.delay, "voting-step timer armed");
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for TokioStepTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
