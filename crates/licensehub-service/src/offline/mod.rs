//! Two-phase offline activation for machines without connectivity.

pub mod exchange;

pub use exchange::{
    CompletedRequest, IssuedActivationCode, OfflineActivationExchange, OfflineRequestTicket,
};
