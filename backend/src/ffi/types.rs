//! Type conversion utilities for FFI boundary
//!
//! Converts query results into PyO3-compatible types (PyDict, PyList).

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::analytics::{ForecastSummary, PercentileSeries};
use crate::error::EnsembleError;
use crate::orchestrator::LoadReport;

/// Map an engine error to the matching Python exception
///
/// Configuration and validation problems are the caller's fault
/// (ValueError); everything else is a RuntimeError.
pub fn ensemble_error_to_py(error: EnsembleError) -> PyErr {
    match error {
        EnsembleError::Configuration(_) | EnsembleError::Validation(_) => {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(error.to_string())
        }
        other => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(other.to_string()),
    }
}

/// Convert forecast series to a list of dicts
///
/// PercentileSeries { percentile: 90, values: [1, 3] }
///   → [{"percentile": 90, "values": [1, 3]}]
pub fn series_to_py(py: Python, series: &[PercentileSeries]) -> PyResult<Py<PyList>> {
    let list = PyList::empty_bound(py);
    for entry in series {
        let dict = PyDict::new_bound(py);
        dict.set_item("percentile", entry.percentile)?;
        dict.set_item("values", entry.values.clone())?;
        list.append(dict)?;
    }
    Ok(list.unbind())
}

/// Convert a forecast summary to a dict with snake_case keys
pub fn summary_to_py(py: Python, summary: &ForecastSummary) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);

    dict.set_item("generation_id", summary.generation_id.map(|id| id.to_string()))?;
    dict.set_item("milestone", summary.milestone)?;
    dict.set_item("simulation_periods", summary.simulation_periods)?;
    dict.set_item("run_count", summary.run_count)?;
    dict.set_item("generated_timestamp", summary.generated_timestamp.to_rfc3339())?;
    dict.set_item(
        "milestone_achievement_simulated",
        summary.milestone_achievement_simulated,
    )?;
    dict.set_item(
        "chance_of_milestone_by_period",
        summary.chance_of_milestone_by_period.clone(),
    )?;
    dict.set_item("forecasts", series_to_py(py, &summary.forecasts)?)?;

    Ok(dict.unbind())
}

/// Convert a load report to a list of `{"key", "reason"}` dicts
pub fn load_report_to_py(py: Python, report: &LoadReport) -> PyResult<Py<PyList>> {
    let list = PyList::empty_bound(py);
    for discarded in &report.discarded {
        let dict = PyDict::new_bound(py);
        dict.set_item("key", &discarded.key)?;
        dict.set_item("reason", &discarded.reason)?;
        list.append(dict)?;
    }
    Ok(list.unbind())
}
