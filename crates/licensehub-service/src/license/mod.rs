//! License keys, validation and administration.

pub mod admin;
pub mod key;
pub mod validator;

pub use admin::{CreateLicenseRequest, IssuedLicense, LicenseAdmin};
pub use key::LicenseKeyFormat;
pub use validator::{LicenseValidator, ValidationResult};
