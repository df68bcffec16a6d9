//! # licensehub-service
//!
//! License lifecycle services for LicenseHub: key validation, activation
//! slot accounting, license administration and the two-phase offline
//! activation exchange.
//!
//! Services follow constructor injection. Every read-then-write of a
//! counter or single-use flag runs inside one unit of work.

pub mod activation;
pub mod application;
pub mod license;
pub mod offline;
pub mod ownership;

pub use activation::{ActivationManager, ClaimOutcome};
pub use application::ApplicationAdmin;
pub use license::{
    CreateLicenseRequest, IssuedLicense, LicenseAdmin, LicenseKeyFormat, LicenseValidator,
    ValidationResult,
};
pub use offline::{
    CompletedRequest, IssuedActivationCode, OfflineActivationExchange, OfflineRequestTicket,
};

#[cfg(test)]
pub(crate) mod testing;
