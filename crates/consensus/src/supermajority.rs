//! Supermajority strategy.

/// Number of votes that constitutes a supermajority among `peers` voters,
/// `2⌊(n−1)/3⌋ + 1`.
pub fn supermajority_size(peers: usize) -> usize {
    2 * (peers.saturating_sub(1) / 3) + 1
}

/// Pluggable agreement threshold.
pub trait SupermajorityChecker: Send + Sync {
    /// Whether `current` collected votes out of `all` voters agree.
    fn has_supermajority(&self, current: usize, all: usize) -> bool;

    /// Whether any candidate could still reach supermajority, given the most
    /// frequent candidate holds `frequent` votes and `voted` of `all` peers
    /// have voted at all.
    fn can_have_supermajority(&self, frequent: usize, voted: usize, all: usize) -> bool;
}

/// The standard BFT threshold, tolerating `⌊(n−1)/3⌋` faulty peers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BftSupermajorityChecker;

impl SupermajorityChecker for BftSupermajorityChecker {
    fn has_supermajority(&self, current: usize, all: usize) -> bool {
        all > 0 && current >= supermajority_size(all)
    }

    fn can_have_supermajority(&self, frequent: usize, voted: usize, all: usize) -> bool {
        let unvoted = all.saturating_sub(voted);
        frequent + unvoted >= supermajority_size(all)
    }
}
