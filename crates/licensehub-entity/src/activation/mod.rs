//! Machine activation entities.

pub mod model;

pub use model::{Activation, ActivationStatus, CreateActivation};
