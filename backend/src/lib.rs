//! Throughput Forecast Core - Rust Engine
//!
//! Bootstrap Monte Carlo ensemble forecaster: resamples historical per-period
//! throughput into thousands of cumulative trajectories and answers
//! conservative percentile and milestone-probability queries over them.
//!
//! # Architecture
//!
//! - **core**: Clock abstraction for generation timestamps
//! - **models**: Domain types (inputs, progression arrays, events)
//! - **sampling**: Bootstrap draw source
//! - **orchestrator**: Batch scheduler and ensemble generator
//! - **analytics**: Percentile and distribution queries
//! - **persistence**: Key/value adapters for ensemble state
//! - **progress**: Progress observers and loading messages
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Cumulative totals never decrease across the periods of a run
//! 2. All randomness is deterministic (seeded RNG, one stream per run)
//! 3. Queries answer only after every run is recorded and sorted
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod analytics;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod progress;
pub mod rng;
pub mod sampling;

// Re-exports for convenience
pub use analytics::{EnsembleView, ForecastSummary, PercentileSeries, DEFAULT_PERCENTILES};
pub use config::{EnsembleConfig, ExecutionMode, DEFAULT_BATCH_SIZE, DEFAULT_RUN_COUNT};
pub use error::{DataIntegrityError, EnsembleError, PersistenceError};
pub use models::{
    event::{Event, EventLog},
    inputs::{HistoricalSample, SimulationInputs},
    progression::{ProgressionByPeriod, SortedProgression},
};
pub use orchestrator::{EnsembleGenerator, GenerationJob, LoadReport, SchedulerState};
pub use persistence::{JsonFileStore, MemoryStore, PersistenceAdapter};
pub use progress::{LoadingTracker, NoopProgress, ProgressObserver};
pub use rng::RngManager;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn throughput_forecast_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::generator::PyEnsembleGenerator>()?;
    Ok(())
}
