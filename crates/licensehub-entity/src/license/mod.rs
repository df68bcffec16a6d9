//! License domain entities.

pub mod features;
pub mod model;
pub mod status;

pub use features::{FeatureSet, FeatureValue};
pub use model::{CreateLicense, License, UpdateLicense};
pub use status::LicenseStatus;
