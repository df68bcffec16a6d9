//! # licensehub-auth
//!
//! Credential verification and authorization for LicenseHub.
//!
//! ## Modules
//!
//! - `rbac`: role-to-scope catalog and scope enforcement
//! - `password`: Argon2id password hashing and policy enforcement
//! - `token`: opaque token generation, hashing and the dummy verification path
//! - `authenticator`: bearer credential verification
//! - `session`: registration, login, logout and identity administration
//! - `api_token`: scoped API token management

pub mod api_token;
pub mod authenticator;
pub mod password;
pub mod rbac;
pub mod session;
pub mod token;

pub use api_token::{ApiTokenManager, IssuedApiToken};
pub use authenticator::{AuthFailure, CredentialKind, Principal, TokenAuthenticator};
pub use password::{PasswordHasher, PasswordValidator};
pub use rbac::{Requirement, ScopeCatalog, ScopeEnforcer};
pub use session::{LoginResult, RegisterIdentity, SessionManager};
pub use token::TokenKind;

#[cfg(test)]
pub(crate) mod testing;
