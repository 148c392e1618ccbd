//! Sticky generator configuration
//!
//! Run count and batch size outlive any single ensemble: a reset or a new
//! generation keeps them. Both start unset; the generator refuses to start
//! until they are positive.

use crate::models::inputs::normalize_positive_count;
use serde::{Deserialize, Serialize};

/// Suggested run count for interactive use
pub const DEFAULT_RUN_COUNT: usize = 10_000;

/// Suggested batch size for interactive use
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// How the runs of one batch are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Runs execute in run-index order on the caller's thread
    #[default]
    Sequential,

    /// Runs of a batch are drawn on the rayon pool, then recorded in
    /// run-index order
    Parallel,
}

/// Generator configuration
///
/// # Example
///
/// ```rust
/// use throughput_forecast_core_rs::EnsembleConfig;
///
/// let config = EnsembleConfig::new(10_000, 200).with_seed(42);
/// assert_eq!(config.run_count, Some(10_000));
/// assert!(config.check().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleConfig {
    /// Total simulation runs per ensemble (N)
    pub run_count: Option<usize>,

    /// Runs per batch before yielding (B)
    pub batch_size: Option<usize>,

    /// Seed for reproducible ensembles; derived from the generation id
    /// when unset
    #[serde(default)]
    pub rng_seed: Option<u64>,

    #[serde(default)]
    pub execution: ExecutionMode,
}

impl EnsembleConfig {
    pub fn new(run_count: usize, batch_size: usize) -> Self {
        Self {
            run_count: Some(run_count),
            batch_size: Some(batch_size),
            rng_seed: None,
            execution: ExecutionMode::Sequential,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Set the run count from free text (unparsable or ≤ 0 → 1)
    pub fn set_run_count_text(&mut self, raw: &str) {
        self.run_count = Some(normalize_positive_count(raw));
    }

    /// Set the batch size from free text (unparsable or ≤ 0 → 1)
    pub fn set_batch_size_text(&mut self, raw: &str) {
        self.batch_size = Some(normalize_positive_count(raw));
    }

    /// Both counts set and positive, as `(run_count, batch_size)`
    pub fn check(&self) -> Result<(usize, usize), String> {
        match (self.run_count, self.batch_size) {
            (Some(runs), Some(batch)) if runs > 0 && batch > 0 => Ok((runs, batch)),
            _ => Err("simulation run count and batch size must both be specified".to_string()),
        }
    }
}
