//! Orchestrator - ensemble generation loop
//!
//! - **scheduler**: batch partitioning state machine
//! - **executor**: draws and records simulation runs
//! - **engine**: the generator owning the ensemble store
//! - **checkpoint**: save/load of generator state
//!
//! See `engine.rs` for the full generation flow.

pub mod checkpoint;
pub mod engine;
pub mod executor;
pub mod scheduler;

// Re-export main types for convenience
pub use checkpoint::{compute_inputs_digest, EnsembleSnapshot, LoadReport};
pub use engine::{EnsembleGenerator, GenerationJob};
pub use executor::{execute_runs, run_simulation, simulate_outcomes};
pub use scheduler::{batch_ranges, BatchScheduler, SchedulerState};
