//! Session and API token credential entities.

pub mod api_token;
pub mod session;

pub use api_token::{CreateApiToken, ScopedCredential, UpdateApiToken};
pub use session::{CreateSession, SessionCredential};
