//! Activation slot accounting.

pub mod manager;

pub use manager::{ActivationManager, ClaimOutcome};
