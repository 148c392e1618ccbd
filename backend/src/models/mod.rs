//! Domain models for the ensemble engine

pub mod event;
pub mod inputs;
pub mod progression;

// Re-exports
pub use event::{Event, EventLog};
pub use inputs::{HistoricalSample, SimulationInputs, MIN_USABLE_SAMPLE_LEN};
pub use progression::{ProgressionByPeriod, SortedProgression};
