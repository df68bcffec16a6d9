//! Role-to-scope catalog and scope enforcement.

pub mod catalog;
pub mod enforcer;

pub use catalog::ScopeCatalog;
pub use enforcer::{Requirement, ScopeEnforcer};
