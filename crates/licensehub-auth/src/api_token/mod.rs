//! Scoped API token management.

pub mod manager;

pub use manager::{ApiTokenManager, IssuedApiToken};
