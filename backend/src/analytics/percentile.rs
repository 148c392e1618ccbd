//! Conservative percentile and milestone likelihood over one sorted period
//!
//! Both functions take a period's cumulative totals sorted ascending.
//!
//! The percentile rule rounds down to the lower neighbouring value and never
//! interpolates: `index = max(0, floor(fraction × len) − 1)`.

/// Value at `fraction` of a sorted array, rounding down.
///
/// `fraction` is clamped to `[0, 1]`; NaN is treated as 0. Returns `None`
/// for an empty array.
///
/// # Example
/// ```
/// use throughput_forecast_core_rs::analytics::conservative_percentile;
///
/// let sorted = [1, 2, 7, 9, 9];
/// assert_eq!(conservative_percentile(&sorted, 0.0), Some(1));
/// assert_eq!(conservative_percentile(&sorted, 0.4), Some(2));
/// assert_eq!(conservative_percentile(&sorted, 1.0), Some(9));
/// ```
pub fn conservative_percentile(sorted: &[u64], fraction: f64) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    let index = conservative_index(sorted.len(), fraction);
    sorted.get(index).copied()
}

/// Index the conservative rule picks for an array of `len` values
pub fn conservative_index(len: usize, fraction: f64) -> usize {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let scaled = (fraction * len as f64).floor() as usize;
    scaled.saturating_sub(1).min(len.saturating_sub(1))
}

/// Share of runs at or above `milestone`.
///
/// `(len − i) / len`, where `i` is the first index with a value
/// `≥ milestone`. Returns `None` for an empty array.
///
/// # Example
/// ```
/// use throughput_forecast_core_rs::analytics::chance_of_reaching;
///
/// let sorted = [1, 2, 7, 9, 9];
/// assert_eq!(chance_of_reaching(&sorted, 9), Some(0.4));
/// assert_eq!(chance_of_reaching(&sorted, 10), Some(0.0));
/// ```
pub fn chance_of_reaching(sorted: &[u64], milestone: u64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let first_reaching = sorted.partition_point(|total| *total < milestone);
    let reaching = sorted.len() - first_reaching;
    Some(reaching as f64 / sorted.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTED: [u64; 5] = [1, 2, 7, 9, 9];

    #[test]
    fn test_conservative_percentile_reference_values() {
        assert_eq!(conservative_percentile(&SORTED, 0.0), Some(1));
        assert_eq!(conservative_percentile(&SORTED, 0.39), Some(1));
        assert_eq!(conservative_percentile(&SORTED, 0.4), Some(2));
        assert_eq!(conservative_percentile(&SORTED, 1.0), Some(9));
    }

    #[test]
    fn test_conservative_percentile_empty() {
        assert_eq!(conservative_percentile(&[], 0.5), None);
    }

    #[test]
    fn test_out_of_range_fraction_clamped() {
        assert_eq!(conservative_percentile(&SORTED, -0.5), Some(1));
        assert_eq!(conservative_percentile(&SORTED, 1.5), Some(9));
        assert_eq!(conservative_percentile(&SORTED, f64::NAN), Some(1));
    }

    #[test]
    fn test_single_value() {
        assert_eq!(conservative_percentile(&[4], 0.0), Some(4));
        assert_eq!(conservative_percentile(&[4], 1.0), Some(4));
    }

    #[test]
    fn test_chance_reference_values() {
        assert_eq!(chance_of_reaching(&SORTED, 9), Some(0.4));
        assert_eq!(chance_of_reaching(&SORTED, 1), Some(1.0));
        assert_eq!(chance_of_reaching(&SORTED, 10), Some(0.0));
        assert_eq!(chance_of_reaching(&SORTED, 0), Some(1.0));
        assert_eq!(chance_of_reaching(&[], 3), None);
    }
}
