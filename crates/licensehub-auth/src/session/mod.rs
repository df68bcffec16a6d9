//! Identity lifecycle: registration, login, logout and administration.

pub mod manager;

pub use manager::{LoginResult, RegisterIdentity, SessionManager};
