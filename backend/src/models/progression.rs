//! Ensemble store
//!
//! Per-period cumulative totals across all runs of one generation.
//!
//! # Critical Invariants
//!
//! 1. `periods[p][i] = periods[p-1][i] + outcome(i, p)`, with an implicit
//!    zero before period 0
//! 2. Runs are appended in run-index order: slot `[p][i]` is written only
//!    after slots `[p][0..i]`
//! 3. The sorted snapshot is derived from a copy; the unsorted arrays are
//!    never reordered

use crate::error::EnsembleError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Cumulative totals indexed `[period][run]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressionByPeriod {
    periods: Vec<Vec<u64>>,
}

impl ProgressionByPeriod {
    /// Create `period_count` empty per-period arrays, each able to hold
    /// `run_capacity` totals without reallocating.
    pub fn with_periods(period_count: usize, run_capacity: usize) -> Self {
        Self {
            periods: (0..period_count)
                .map(|_| Vec::with_capacity(run_capacity))
                .collect(),
        }
    }

    /// Wrap arrays restored from persistence. See [`Self::check_consistency`].
    pub fn from_periods(periods: Vec<Vec<u64>>) -> Self {
        Self { periods }
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    /// Number of runs fully recorded (present in the final period)
    pub fn completed_runs(&self) -> usize {
        self.periods.last().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period(&self, period: usize) -> Option<&[u64]> {
        self.periods.get(period).map(Vec::as_slice)
    }

    pub fn periods(&self) -> &[Vec<u64>] {
        &self.periods
    }

    /// Cumulative totals of one run across all periods
    pub fn trajectory(&self, run_index: usize) -> Option<Vec<u64>> {
        self.periods
            .iter()
            .map(|totals| totals.get(run_index).copied())
            .collect()
    }

    /// Record the outcome of `period` for run `run_index` and return the new
    /// cumulative total.
    ///
    /// The run must be the next one expected for that period, and the
    /// previous period of the same run must already be recorded.
    pub fn record_period_outcome(
        &mut self,
        period: usize,
        run_index: usize,
        outcome: u32,
    ) -> Result<u64, EnsembleError> {
        let period_count = self.periods.len();
        if period >= period_count {
            return Err(EnsembleError::Validation(format!(
                "period {} out of range for {} periods",
                period, period_count
            )));
        }

        let previous_total = if period > 0 {
            match self.periods[period - 1].get(run_index) {
                Some(total) => *total,
                None => {
                    return Err(EnsembleError::Validation(format!(
                        "run {} has no total for period {}",
                        run_index,
                        period - 1
                    )))
                }
            }
        } else {
            0
        };

        let slot = &mut self.periods[period];
        if slot.len() != run_index {
            return Err(EnsembleError::Validation(format!(
                "run {} recorded out of order at period {} (expected run {})",
                run_index,
                period,
                slot.len()
            )));
        }

        let total = previous_total + u64::from(outcome);
        slot.push(total);
        Ok(total)
    }

    /// Record one run's per-period outcomes in period order
    pub fn record_run(&mut self, run_index: usize, outcomes: &[u32]) -> Result<(), EnsembleError> {
        if outcomes.len() != self.periods.len() {
            return Err(EnsembleError::Validation(format!(
                "run {} produced {} outcomes for {} periods",
                run_index,
                outcomes.len(),
                self.periods.len()
            )));
        }
        for (period, outcome) in outcomes.iter().enumerate() {
            self.record_period_outcome(period, run_index, *outcome)?;
        }
        Ok(())
    }

    /// Sorted copy of every period. `self` is left untouched.
    pub fn sorted(&self) -> SortedProgression {
        SortedProgression {
            periods: self
                .periods
                .iter()
                .map(|totals| {
                    let mut copy = totals.clone();
                    copy.sort_unstable();
                    copy
                })
                .collect(),
        }
    }

    /// Same as [`Self::sorted`], one period per rayon task
    pub fn par_sorted(&self) -> SortedProgression {
        SortedProgression {
            periods: self
                .periods
                .par_iter()
                .map(|totals| {
                    let mut copy = totals.clone();
                    copy.sort_unstable();
                    copy
                })
                .collect(),
        }
    }

    /// Check shape and monotonicity of restored arrays.
    ///
    /// Every period must hold the same number of runs, and each run's totals
    /// must be non-decreasing across periods.
    pub fn check_consistency(&self) -> Result<(), String> {
        let Some(first) = self.periods.first() else {
            return Ok(());
        };
        let runs = first.len();

        for (period, totals) in self.periods.iter().enumerate() {
            if totals.len() != runs {
                return Err(format!(
                    "period {} holds {} runs, period 0 holds {}",
                    period,
                    totals.len(),
                    runs
                ));
            }
        }

        for window in self.periods.windows(2) {
            if window[0].iter().zip(&window[1]).any(|(prev, next)| next < prev) {
                return Err("cumulative totals decrease between periods".to_string());
            }
        }
        Ok(())
    }
}

/// Read-only snapshot with each period sorted ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortedProgression {
    periods: Vec<Vec<u64>>,
}

impl SortedProgression {
    /// Wrap arrays restored from persistence, rejecting unsorted input
    pub fn from_periods(periods: Vec<Vec<u64>>) -> Result<Self, String> {
        for (period, totals) in periods.iter().enumerate() {
            if totals.windows(2).any(|pair| pair[1] < pair[0]) {
                return Err(format!("period {} is not sorted ascending", period));
            }
        }
        Ok(Self { periods })
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn period(&self, period: usize) -> Option<&[u64]> {
        self.periods.get(period).map(Vec::as_slice)
    }

    pub fn last_period(&self) -> Option<&[u64]> {
        self.periods.last().map(Vec::as_slice)
    }

    pub fn periods(&self) -> &[Vec<u64>] {
        &self.periods
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}
