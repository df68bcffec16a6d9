//! SQL repositories for every LicenseHub table.
//!
//! Repositories are stateless and run against a borrowed connection so the
//! caller decides which transaction they join.

pub mod activation;
pub mod application;
pub mod credential;
pub mod identity;
pub mod license;
pub mod offline;

pub use activation::ActivationRepository;
pub use application::ApplicationRepository;
pub use credential::CredentialRepository;
pub use identity::IdentityRepository;
pub use license::LicenseRepository;
pub use offline::OfflineRepository;

use licensehub_core::error::{AppError, ErrorKind};

/// Map a sqlx error onto the workspace taxonomy.
///
/// Unique violations become `Conflict`, check violations `Internal`, and
/// everything else `Storage`.
pub(crate) fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        let kind = match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Conflict,
            sqlx::Error::Database(db) if db.is_check_violation() => ErrorKind::Internal,
            _ => ErrorKind::Storage,
        };
        AppError::with_source(kind, message, e)
    }
}

/// Fail with `NotFound` when an update touched no row.
pub(crate) fn expect_row(rows_affected: u64, what: &str) -> Result<(), AppError> {
    if rows_affected == 0 {
        Err(AppError::not_found(format!("{what} not found")))
    } else {
        Ok(())
    }
}
