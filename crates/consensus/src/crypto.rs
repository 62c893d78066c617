//! Vote signing and verification.

use accord_types::{vote_signing_message, KeyPair, VoteMessage, YacHash};

/// Produces and checks signed votes.
pub trait CryptoProvider: Send {
    /// Sign `hash` into a vote from this node.
    fn get_vote(&self, hash: YacHash) -> VoteMessage;

    /// Verify every vote in the bundle. An empty bundle does not verify.
    fn verify(&self, votes: &[VoteMessage]) -> bool;
}

/// Ed25519-backed provider using the node's keypair.
pub struct Ed25519CryptoProvider {
    keypair: KeyPair,
}

impl Ed25519CryptoProvider {
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }
}

impl CryptoProvider for Ed25519CryptoProvider {
    fn get_vote(&self, hash: YacHash) -> VoteMessage {
        let signature = self.keypair.sign(&vote_signing_message(&hash));
        VoteMessage { hash, signature }
    }

    fn verify(&self, votes: &[VoteMessage]) -> bool {
        !votes.is_empty()
            && votes
                .iter()
                .all(|vote| vote.signature.verify(&vote_signing_message(&vote.hash)))
    }
}
