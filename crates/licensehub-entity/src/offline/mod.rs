//! Offline activation entities.

pub mod code;
pub mod request;

pub use code::{CreateOfflineCode, OfflineActivationCode};
pub use request::{ActivationRequestForm, CreateRequestForm, RequestStatus};
