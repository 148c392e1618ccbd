//! Forecast series by confidence percentile
//!
//! A percentile label `L` (0–100) reads as "an L% chance of at least this
//! much progress". Its value at a period is the conservative percentile of
//! that period at fraction `(100 − L) / 100`, computed in integer arithmetic:
//!
//! ```text
//! index = max(0, floor(len × (100 − L) / 100) − 1)
//! ```
//!
//! Series are returned as an ordered list, never a map, so iteration order
//! is the order of the requested labels.

use crate::models::SortedProgression;
use serde::{Deserialize, Serialize};

/// Default labels for burn-up charts
pub const DEFAULT_PERCENTILES: [u8; 5] = [90, 75, 50, 25, 10];

/// One labelled forecast across all periods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileSeries {
    pub percentile: u8,
    pub values: Vec<u64>,
}

/// Index into a sorted array of `len` values for confidence label `percentile`
pub fn percentile_label_index(len: usize, percentile: u8) -> usize {
    let complement = 100 - usize::from(percentile.min(100));
    let scaled = len * complement / 100;
    scaled.saturating_sub(1).min(len.saturating_sub(1))
}

/// Forecast value of one sorted period for `percentile`
pub fn forecast_at(sorted: &[u64], percentile: u8) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    sorted.get(percentile_label_index(sorted.len(), percentile)).copied()
}

/// One series per label, in the order given. Empty periods contribute 0.
pub fn forecasts_by_percentiles(sorted: &SortedProgression, percentiles: &[u8]) -> Vec<PercentileSeries> {
    percentiles
        .iter()
        .map(|&percentile| PercentileSeries {
            percentile,
            values: sorted
                .periods()
                .iter()
                .map(|period| forecast_at(period, percentile).unwrap_or(0))
                .collect(),
        })
        .collect()
}

/// Stacked (delta) series for layered bands.
///
/// Labels are deduplicated and ordered descending. The highest label keeps
/// its forecast; every other label holds the difference between its
/// forecast and the forecast of the next-higher label, so the bands sum back
/// to the original forecasts.
///
/// # Example
/// ```
/// use throughput_forecast_core_rs::analytics::iterative_forecasts_by_percentiles;
/// use throughput_forecast_core_rs::models::SortedProgression;
///
/// let sorted = SortedProgression::from_periods(vec![(1..=10).collect()]).unwrap();
/// let bands = iterative_forecasts_by_percentiles(&sorted, &[50, 90]);
///
/// assert_eq!(bands[0].percentile, 90);
/// assert_eq!(bands[0].values, vec![1]);
/// assert_eq!(bands[1].percentile, 50);
/// assert_eq!(bands[1].values, vec![4]); // 5 at the median, minus 1
/// ```
pub fn iterative_forecasts_by_percentiles(
    sorted: &SortedProgression,
    percentiles: &[u8],
) -> Vec<PercentileSeries> {
    let mut descending: Vec<u8> = percentiles.iter().map(|p| (*p).min(100)).collect();
    descending.sort_unstable_by(|a, b| b.cmp(a));
    descending.dedup();

    let forecasts = forecasts_by_percentiles(sorted, &descending);

    forecasts
        .iter()
        .enumerate()
        .map(|(position, series)| {
            let values = match position.checked_sub(1).map(|higher| &forecasts[higher]) {
                None => series.values.clone(),
                Some(higher) => series
                    .values
                    .iter()
                    .zip(&higher.values)
                    .map(|(value, base)| value.saturating_sub(*base))
                    .collect(),
            };
            PercentileSeries {
                percentile: series.percentile,
                values,
            }
        })
        .collect()
}
