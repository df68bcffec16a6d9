//! Token digests and the not-found verification path.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-256 hex digest of a token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Compare two digests in constant time.
pub fn digests_match(stored: &str, computed: &str) -> bool {
    stored.as_bytes().ct_eq(computed.as_bytes()).into()
}

/// Work performed when a presented token has no stored record.
///
/// Runs a fixed number of SHA-256 rounds and a constant-time comparison so
/// the not-found branch costs about as much as a real lookup and verify.
#[derive(Debug, Clone, Copy)]
pub struct DummyVerifier {
    rounds: u32,
}

impl DummyVerifier {
    /// Creates a verifier running `rounds` hash rounds.
    pub fn new(rounds: u32) -> Self {
        Self { rounds }
    }

    /// Burn the configured work against `digest`. Always reports a mismatch.
    pub fn verify(&self, digest: &str) -> bool {
        let mut acc = Sha256::digest(digest.as_bytes());
        for _ in 0..self.rounds {
            acc = Sha256::digest(acc);
        }
        let burned = hex::encode(acc);
        let matched: bool = burned.as_bytes().ct_eq(digest.as_bytes()).into();
        std::hint::black_box(matched);
        false
    }
}
