//! Simulation run executor
//!
//! One run draws P outcomes in period order and records the running total of
//! each period. Periods of a run are strictly sequential; runs share nothing
//! but the read-only historical sample, so a batch of runs can be drawn on
//! worker threads and recorded afterwards.

use crate::config::ExecutionMode;
use crate::error::EnsembleError;
use crate::models::{HistoricalSample, ProgressionByPeriod};
use crate::sampling::{BootstrapSampler, DrawSource};
use rayon::prelude::*;
use std::ops::Range;

fn check_periods(periods: usize) -> Result<(), EnsembleError> {
    if periods < 1 {
        return Err(EnsembleError::Validation(
            "a positive simulation periods value is required in order to run a simulation"
                .to_string(),
        ));
    }
    Ok(())
}

/// Draw the per-period outcomes of one run without recording them
pub fn simulate_outcomes(source: &mut dyn DrawSource, periods: usize) -> Result<Vec<u32>, EnsembleError> {
    check_periods(periods)?;
    (0..periods).map(|_| source.draw()).collect()
}

/// Execute run `run_index`, recording each period's cumulative total
pub fn run_simulation(
    store: &mut ProgressionByPeriod,
    source: &mut dyn DrawSource,
    run_index: usize,
    periods: usize,
) -> Result<(), EnsembleError> {
    check_periods(periods)?;
    for period in 0..periods {
        let outcome = source.draw()?;
        store.record_period_outcome(period, run_index, outcome)?;
    }
    Ok(())
}

/// Execute the runs of one batch.
///
/// Each run draws from its own stream (`seed`, run index), so both modes
/// record identical totals.
pub fn execute_runs(
    store: &mut ProgressionByPeriod,
    sample: &HistoricalSample,
    seed: u64,
    runs: Range<usize>,
    mode: ExecutionMode,
) -> Result<(), EnsembleError> {
    let periods = store.period_count();

    match mode {
        ExecutionMode::Sequential => {
            for run_index in runs {
                let mut sampler = BootstrapSampler::for_run(sample, seed, run_index);
                run_simulation(store, &mut sampler, run_index, periods)?;
            }
        }
        ExecutionMode::Parallel => {
            let outcomes = runs
                .clone()
                .into_par_iter()
                .map(|run_index| {
                    let mut sampler = BootstrapSampler::for_run(sample, seed, run_index);
                    simulate_outcomes(&mut sampler, periods)
                })
                .collect::<Result<Vec<_>, _>>()?;

            for (run_index, run_outcomes) in runs.zip(outcomes) {
                store.record_run(run_index, &run_outcomes)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed list of outcomes
    struct ScriptedDraws {
        outcomes: std::vec::IntoIter<u32>,
    }

    impl ScriptedDraws {
        fn new(outcomes: Vec<u32>) -> Self {
            Self {
                outcomes: outcomes.into_iter(),
            }
        }
    }

    impl DrawSource for ScriptedDraws {
        fn draw(&mut self) -> Result<u32, EnsembleError> {
            self.outcomes
                .next()
                .ok_or_else(|| EnsembleError::Validation("script exhausted".to_string()))
        }
    }

    #[test]
    fn test_run_records_running_totals() {
        let mut store = ProgressionByPeriod::with_periods(4, 1);
        let mut draws = ScriptedDraws::new(vec![3, 0, 5, 2]);

        run_simulation(&mut store, &mut draws, 0, 4).unwrap();

        assert_eq!(store.trajectory(0), Some(vec![3, 3, 8, 10]));
    }

    #[test]
    fn test_zero_periods_rejected() {
        let mut store = ProgressionByPeriod::with_periods(0, 1);
        let mut draws = ScriptedDraws::new(vec![1]);
        assert!(matches!(
            run_simulation(&mut store, &mut draws, 0, 0),
            Err(EnsembleError::Validation(_))
        ));
        assert!(simulate_outcomes(&mut draws, 0).is_err());
    }

    #[test]
    fn test_draw_failure_propagates() {
        let mut store = ProgressionByPeriod::with_periods(3, 1);
        let mut draws = ScriptedDraws::new(vec![1]);
        assert!(run_simulation(&mut store, &mut draws, 0, 3).is_err());
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let sample = HistoricalSample::new(vec![0, 3, 4, 9, 12]);

        let mut sequential = ProgressionByPeriod::with_periods(5, 40);
        execute_runs(&mut sequential, &sample, 11, 0..40, ExecutionMode::Sequential).unwrap();

        let mut parallel = ProgressionByPeriod::with_periods(5, 40);
        execute_runs(&mut parallel, &sample, 11, 0..25, ExecutionMode::Parallel).unwrap();
        execute_runs(&mut parallel, &sample, 11, 25..40, ExecutionMode::Parallel).unwrap();

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_empty_sample_fails_batch() {
        let mut store = ProgressionByPeriod::with_periods(2, 1);
        let result = execute_runs(
            &mut store,
            &HistoricalSample::default(),
            1,
            0..1,
            ExecutionMode::Sequential,
        );
        assert!(matches!(result, Err(EnsembleError::Validation(_))));
    }
}
