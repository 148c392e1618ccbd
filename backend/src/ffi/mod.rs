//! Python bindings (feature `pyo3`)
//!
//! - **generator**: `EnsembleGenerator` class
//! - **types**: conversions of query results to Python dicts and lists

pub mod generator;
pub mod types;
