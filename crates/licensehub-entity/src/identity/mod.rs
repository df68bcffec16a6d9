//! Identity domain entities.

pub mod model;
pub mod role;

pub use model::{CreateIdentity, Identity};
pub use role::{BusinessRole, SystemRole};
