//! Collaborator traits injected into the core.

pub mod clock;
pub mod random;

pub use clock::{Clock, ManualClock, SystemClock};
pub use random::{OsRandom, RandomSource};
