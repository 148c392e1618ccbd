//! Core services shared by the engine

pub mod clock;

pub use clock::{Clock, FixedClock, SystemClock};
