//! # licensehub-database
//!
//! Transactional persistence for LicenseHub. The [`Store`] trait hands out
//! [`UnitOfWork`] handles; every read-then-write of a counter or single-use
//! flag happens inside one of them. Two implementations are provided:
//! [`PgStore`] over a sqlx PostgreSQL pool, and [`MemoryStore`] for tests
//! and embedded use.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{
    ActivationStore, ApplicationStore, CredentialStore, IdentityStore, LicenseStore, MemoryStore,
    OfflineStore, PgStore, Store, UnitOfWork,
};
