//! Opaque bearer tokens.
//!
//! Tokens are a kind prefix followed by 32 random bytes in unpadded
//! base64url. Only the SHA-256 hex digest of the full token is stored.

pub mod generator;
pub mod hashing;

pub use generator::{TokenKind, generate_token};
pub use hashing::{DummyVerifier, digests_match, hash_token};
