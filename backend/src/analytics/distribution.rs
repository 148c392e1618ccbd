//! Milestone distributions across periods
//!
//! Two views of when runs reach the milestone, both as percentages of runs:
//!
//! - [`milestone_met_distribution`]: share of runs whose cumulative total at
//!   exactly that period is at or above the milestone. Threshold scan on the
//!   sorted snapshot. This is the authoritative definition.
//! - [`first_passage_distribution`]: share of runs that reach the milestone
//!   for the first time in that period. Scan of each run's trajectory.
//!
//! Cumulative totals never decrease, so a run at or above the milestone at
//! period p has been there since its first passage. The running sum of the
//! first-passage distribution therefore equals the met distribution.

use crate::analytics::percentile::chance_of_reaching;
use crate::models::{ProgressionByPeriod, SortedProgression};

/// Percentage (0–100) of runs at or above `milestone`, per period
pub fn milestone_met_distribution(sorted: &SortedProgression, milestone: u64) -> Vec<f64> {
    sorted
        .periods()
        .iter()
        .map(|period| chance_of_reaching(period, milestone).map_or(0.0, |chance| chance * 100.0))
        .collect()
}

/// Percentage (0–100) of runs first reaching `milestone`, per period
pub fn first_passage_distribution(progression: &ProgressionByPeriod, milestone: u64) -> Vec<f64> {
    let period_count = progression.period_count();
    let runs = progression.completed_runs();
    let mut first_passages = vec![0usize; period_count];

    for run_index in 0..runs {
        let first = progression
            .periods()
            .iter()
            .position(|totals| totals.get(run_index).is_some_and(|total| *total >= milestone));
        if let Some(period) = first {
            first_passages[period] += 1;
        }
    }

    first_passages
        .into_iter()
        .map(|count| {
            if runs == 0 {
                0.0
            } else {
                count as f64 / runs as f64 * 100.0
            }
        })
        .collect()
}

/// Running sum of a per-period distribution
pub fn cumulative(distribution: &[f64]) -> Vec<f64> {
    distribution
        .iter()
        .scan(0.0, |running, share| {
            *running += share;
            Some(*running)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progression() -> ProgressionByPeriod {
        let mut progression = ProgressionByPeriod::with_periods(3, 4);
        progression.record_run(0, &[10, 0, 0]).unwrap(); // first at 0
        progression.record_run(1, &[0, 10, 0]).unwrap(); // first at 1
        progression.record_run(2, &[5, 0, 5]).unwrap(); // first at 2
        progression.record_run(3, &[0, 0, 0]).unwrap(); // never
        progression
    }

    #[test]
    fn test_met_distribution() {
        let sorted = progression().sorted();
        assert_eq!(milestone_met_distribution(&sorted, 10), vec![25.0, 50.0, 75.0]);
    }

    #[test]
    fn test_first_passage_distribution() {
        assert_eq!(
            first_passage_distribution(&progression(), 10),
            vec![25.0, 25.0, 25.0]
        );
    }

    #[test]
    fn test_running_first_passage_equals_met() {
        let progression = progression();
        let met = milestone_met_distribution(&progression.sorted(), 10);
        let running = cumulative(&first_passage_distribution(&progression, 10));
        for (a, b) in met.iter().zip(&running) {
            assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_empty_progression() {
        let empty = ProgressionByPeriod::with_periods(2, 0);
        assert_eq!(first_passage_distribution(&empty, 5), vec![0.0, 0.0]);
        assert_eq!(milestone_met_distribution(&empty.sorted(), 5), vec![0.0, 0.0]);
    }
}
