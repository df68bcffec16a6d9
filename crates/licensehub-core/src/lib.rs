//! # licensehub-core
//!
//! Core crate for LicenseHub. Contains the unified error system,
//! configuration schemas, and the clock and randomness collaborators
//! injected into every stateful component.
//!
//! This crate has **no** internal dependencies on other LicenseHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use traits::{Clock, ManualClock, OsRandom, RandomSource, SystemClock};
