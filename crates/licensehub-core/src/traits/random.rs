//! Cryptographically secure randomness.

use rand::RngCore;
use rand::rngs::OsRng;

/// Upper-case alphanumeric alphabet used for activation codes and keys.
pub const ALPHANUMERIC_UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A cryptographically secure random byte source.
pub trait RandomSource: Send + Sync + std::fmt::Debug {
    /// Fills `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);

    /// Returns `len` fresh random bytes.
    fn bytes(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.fill_bytes(&mut buf);
        buf
    }

    /// Returns a string of `len` characters drawn uniformly from `alphabet`.
    ///
    /// Uses rejection sampling so no character is favoured. `alphabet` must
    /// hold between 1 and 256 characters.
    fn string_from(&self, alphabet: &[u8], len: usize) -> String {
        let n = alphabet.len();
        if n == 0 {
            return String::new();
        }
        // Largest multiple of n that fits in a byte.
        let limit = 256 - (256 % n);
        let mut out = String::with_capacity(len);
        let mut buf = [0u8; 64];
        while out.len() < len {
            self.fill_bytes(&mut buf);
            for &b in &buf {
                if (b as usize) < limit {
                    out.push(alphabet[(b as usize) % n] as char);
                    if out.len() == len {
                        break;
                    }
                }
            }
        }
        out
    }
}

/// Operating-system randomness via [`OsRng`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}
