//! # licensehub-entity
//!
//! Domain entity models for LicenseHub. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod activation;
pub mod application;
pub mod credential;
pub mod identity;
pub mod license;
pub mod offline;
pub mod scope;

pub use activation::{Activation, ActivationStatus};
pub use application::Application;
pub use credential::{ScopedCredential, SessionCredential};
pub use identity::{BusinessRole, Identity, SystemRole};
pub use license::{FeatureSet, FeatureValue, License, LicenseStatus};
pub use offline::{ActivationRequestForm, OfflineActivationCode, RequestStatus};
pub use scope::{Scope, ScopeSet};
