//! Simulation inputs
//!
//! The historical sample, milestone and period count a generation is started
//! from, plus the defensive text normalization the input collaborator applies
//! before handing values to the engine.
//!
//! Normalization never fails: unparsable text becomes a safe default (1 for
//! counts, 0 for the milestone). Rejecting a well-formed but unusable value is
//! a separate policy step ([`SimulationInputs::validate`]).

use crate::error::EnsembleError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Minimum number of historical records a forecast needs
pub const MIN_USABLE_SAMPLE_LEN: usize = 2;

/// Immutable snapshot of historical per-period throughput
///
/// Cloning is cheap: the values are shared behind an `Arc`.
///
/// # Example
/// ```
/// use throughput_forecast_core_rs::HistoricalSample;
///
/// let sample = HistoricalSample::new(vec![3, 5, 4]);
/// assert_eq!(sample.len(), 3);
/// assert!(sample.is_usable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalSample {
    values: Arc<[u32]>,
}

impl HistoricalSample {
    pub fn new(values: Vec<u32>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when the sample holds enough records to forecast from
    pub fn is_usable(&self) -> bool {
        self.values.len() >= MIN_USABLE_SAMPLE_LEN
    }
}

impl Default for HistoricalSample {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Inputs captured at the start of a generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInputs {
    /// Target cumulative value; 0 means "unset"
    pub milestone: u64,

    /// Number of future periods to simulate
    pub simulation_periods: usize,

    /// Historical per-period throughput
    pub historical_data: Vec<u32>,
}

impl SimulationInputs {
    pub fn new(milestone: u64, simulation_periods: usize, historical_data: Vec<u32>) -> Self {
        Self {
            milestone,
            simulation_periods,
            historical_data,
        }
    }

    /// Caller-side check: milestone positive, at least one period, and a
    /// usable historical sample.
    pub fn validate(&self) -> Result<(), EnsembleError> {
        if self.milestone == 0 {
            return Err(EnsembleError::Validation(
                "milestone must be a positive integer".to_string(),
            ));
        }
        if self.simulation_periods == 0 {
            return Err(EnsembleError::Validation(
                "simulation periods must be at least 1".to_string(),
            ));
        }
        if self.historical_data.len() < MIN_USABLE_SAMPLE_LEN {
            return Err(EnsembleError::Validation(format!(
                "historical data needs at least {} records, got {}",
                MIN_USABLE_SAMPLE_LEN,
                self.historical_data.len()
            )));
        }
        Ok(())
    }

    pub fn sample(&self) -> HistoricalSample {
        HistoricalSample::new(self.historical_data.clone())
    }

    /// Replace the milestone from free text (unparsable → 0)
    pub fn set_milestone_text(&mut self, raw: &str) {
        self.milestone = normalize_milestone(raw);
    }

    /// Replace the period count from free text (unparsable or ≤ 0 → 1)
    pub fn set_simulation_periods_text(&mut self, raw: &str) {
        self.simulation_periods = normalize_positive_count(raw);
    }

    /// Replace the historical data from free text.
    ///
    /// Returns `false` when the parsed values equal the current data and
    /// nothing changed.
    pub fn set_historical_data_text(&mut self, text: &str) -> bool {
        let parsed = parse_historical_data_text(text);
        if parsed == self.historical_data {
            return false;
        }
        self.historical_data = parsed;
        true
    }

    /// Grow (zero-padded) or truncate the historical data to `count` records
    pub fn set_historical_record_count(&mut self, count: usize) {
        self.historical_data.resize(count, 0);
    }

    /// Historical data joined as `"a, b, c"`
    pub fn historical_data_as_text(&self) -> String {
        self.historical_data
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parse the leading integer of `raw`, ignoring surrounding whitespace and
/// any trailing garbage (`"12 items"` → 12).
pub fn parse_leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Overlong digit runs saturate
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Counts (periods, run count, batch size): unparsable or non-positive → 1
pub fn normalize_positive_count(raw: &str) -> usize {
    match parse_leading_integer(raw) {
        Some(value) if value > 0 => usize::try_from(value).unwrap_or(usize::MAX),
        _ => 1,
    }
}

/// Milestone: unparsable or negative → 0
pub fn normalize_milestone(raw: &str) -> u64 {
    match parse_leading_integer(raw) {
        Some(value) if value > 0 => value as u64,
        _ => 0,
    }
}

/// Split free text on whitespace, commas and semicolons into records.
///
/// Non-numeric tokens are dropped, decimals are floored, and negative or
/// out-of-range values are discarded since throughput cannot be negative.
///
/// # Example
/// ```
/// use throughput_forecast_core_rs::models::inputs::parse_historical_data_text;
///
/// assert_eq!(parse_historical_data_text("3, 4.7;x  0"), vec![3, 4, 0]);
/// ```
pub fn parse_historical_data_text(text: &str) -> Vec<u32> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .map(f64::floor)
        .filter(|value| *value >= 0.0 && *value <= u32::MAX as f64)
        .map(|value| value as u32)
        .collect()
}
