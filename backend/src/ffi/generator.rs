//! PyO3 wrapper for EnsembleGenerator
//!
//! This module provides the Python interface to the ensemble generator.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use super::types::{ensemble_error_to_py, load_report_to_py, series_to_py, summary_to_py};
use crate::config::{EnsembleConfig, ExecutionMode, DEFAULT_BATCH_SIZE, DEFAULT_RUN_COUNT};
use crate::models::SimulationInputs;
use crate::orchestrator::EnsembleGenerator;
use crate::persistence::JsonFileStore;
use crate::progress::NoopProgress;

/// Python wrapper for the Rust EnsembleGenerator
///
/// # Example (from Python)
///
/// ```python
/// from throughput_forecast_core_rs import EnsembleGenerator
///
/// generator = EnsembleGenerator(run_count=10_000, batch_size=200, rng_seed=42)
/// generator.generate(milestone=150, simulation_periods=12, historical_data=[8, 14, 11, 9])
///
/// print(generator.chance_of_achieving_milestone_by_period(11))
/// print(generator.forecasts_by_percentiles([90, 50, 10]))
/// ```
#[pyclass(name = "EnsembleGenerator")]
pub struct PyEnsembleGenerator {
    inner: EnsembleGenerator,
}

#[pymethods]
impl PyEnsembleGenerator {
    /// Create a generator with sticky run count and batch size
    #[new]
    #[pyo3(signature = (run_count=DEFAULT_RUN_COUNT, batch_size=DEFAULT_BATCH_SIZE, rng_seed=None, parallel=false))]
    fn new(run_count: usize, batch_size: usize, rng_seed: Option<u64>, parallel: bool) -> Self {
        let mut config = EnsembleConfig::new(run_count, batch_size);
        config.rng_seed = rng_seed;
        config.execution = if parallel {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        };
        PyEnsembleGenerator {
            inner: EnsembleGenerator::new(config),
        }
    }

    /// Generate a complete ensemble
    ///
    /// # Errors
    ///
    /// Raises ValueError if run count or batch size are not positive, the
    /// period count is zero or the historical data is empty.
    fn generate(
        &mut self,
        milestone: u64,
        simulation_periods: usize,
        historical_data: Vec<u32>,
    ) -> PyResult<()> {
        let inputs = SimulationInputs::new(milestone, simulation_periods, historical_data);
        self.inner
            .generate(&inputs, &mut NoopProgress)
            .map_err(ensemble_error_to_py)
    }

    /// Wipe the ensemble, keeping run count and batch size
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn set_run_count(&mut self, run_count: usize) {
        self.inner.set_run_count(run_count);
    }

    fn set_batch_size(&mut self, batch_size: usize) {
        self.inner.set_batch_size(batch_size);
    }

    // ========================================================================
    // Query Methods
    // ========================================================================

    fn completed_simulation_count(&self) -> usize {
        self.inner.completed_simulation_count()
    }

    fn is_generated(&self) -> bool {
        self.inner.is_generated()
    }

    /// Generated timestamp as RFC 3339, or None
    #[getter]
    fn generated_timestamp(&self) -> Option<String> {
        self.inner.generated_timestamp().map(|at| at.to_rfc3339())
    }

    #[getter]
    fn milestone(&self) -> Option<u64> {
        self.inner.milestone()
    }

    #[getter]
    fn simulation_periods(&self) -> Option<usize> {
        self.inner.simulation_periods()
    }

    /// Conservative percentile of a period
    ///
    /// Returns None until the ensemble is generated or when the period has
    /// no data.
    fn conservatively_percentiled_progression_at_period(
        &self,
        period: usize,
        fraction: f64,
    ) -> Option<u64> {
        self.inner
            .conservatively_percentiled_progression_at_period(period, fraction)
    }

    fn chance_of_achieving_milestone_by_period(&self, period: usize) -> Option<f64> {
        self.inner.chance_of_achieving_milestone_by_period(period)
    }

    fn is_milestone_achievement_simulated(&self) -> bool {
        self.inner.is_milestone_achievement_simulated()
    }

    /// Forecast series as `[{"percentile": p, "values": [...]}, ...]`
    fn forecasts_by_percentiles(&self, py: Python, percentiles: Vec<u8>) -> PyResult<Option<Py<PyList>>> {
        self.inner
            .view()
            .map(|view| series_to_py(py, &view.forecasts_by_percentiles(&percentiles)))
            .transpose()
    }

    /// Stacked forecast bands, highest percentile first
    fn iterative_forecasts_by_percentiles(
        &self,
        py: Python,
        percentiles: Vec<u8>,
    ) -> PyResult<Option<Py<PyList>>> {
        self.inner
            .view()
            .map(|view| series_to_py(py, &view.iterative_forecasts_by_percentiles(&percentiles)))
            .transpose()
    }

    fn milestone_met_distribution(&self) -> Option<Vec<f64>> {
        self.inner.view()?.milestone_met_distribution()
    }

    fn first_passage_distribution(&self) -> Option<Vec<f64>> {
        self.inner.view()?.first_passage_distribution()
    }

    /// Summary dict of the generated ensemble, or None
    fn summary(&self, py: Python, percentiles: Vec<u8>) -> PyResult<Option<Py<PyDict>>> {
        self.inner
            .view()
            .map(|view| summary_to_py(py, &view.summary(&percentiles)))
            .transpose()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the ensemble to a JSON store file
    fn save(&self, path: &str) -> PyResult<()> {
        let mut store = JsonFileStore::new(path);
        self.inner.save_to(&mut store).map_err(ensemble_error_to_py)
    }

    /// Restore from a JSON store file
    ///
    /// Returns the discarded fields as `[{"key": ..., "reason": ...}]`.
    fn load(&mut self, py: Python, path: &str) -> PyResult<Py<PyList>> {
        let store = JsonFileStore::new(path);
        let report = self.inner.load_from(&store).map_err(ensemble_error_to_py)?;
        load_report_to_py(py, &report)
    }
}
