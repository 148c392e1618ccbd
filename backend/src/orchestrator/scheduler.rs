//! Batch scheduler
//!
//! Partitions N runs into batches of B and tracks where a generation is:
//!
//! ```text
//! Idle → Running(0) → Running(B) → … → Finalizing → Done
//! ```
//!
//! From `Running(start)`, the batch is `[start, min(start + B, N))`. If runs
//! remain afterwards the scheduler moves to `Running(start + B)`, otherwise
//! to `Finalizing`. The scheduler never executes runs itself; the generator
//! asks it for the next range and reports completion, and returning to the
//! host between those calls is the suspension point.

use crate::config::EnsembleConfig;
use crate::error::EnsembleError;
use std::ops::Range;

/// Position of a generation in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// Next batch starts at run `start`
    Running { start: usize },
    /// All runs recorded, sorted snapshot not built yet
    Finalizing,
    Done,
}

/// Batch partitioning state machine
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    run_count: usize,
    batch_size: usize,
    state: SchedulerState,
}

impl BatchScheduler {
    /// Scheduler for a configuration whose run count and batch size are set
    /// and positive. Anything else is a configuration error.
    pub fn from_config(config: &EnsembleConfig) -> Result<Self, EnsembleError> {
        let (run_count, batch_size) = config.check().map_err(EnsembleError::Configuration)?;
        Self::new(run_count, batch_size)
    }

    pub fn new(run_count: usize, batch_size: usize) -> Result<Self, EnsembleError> {
        if run_count == 0 || batch_size == 0 {
            return Err(EnsembleError::Configuration(
                "simulation run count and batch size must both be positive".to_string(),
            ));
        }
        Ok(Self {
            run_count,
            batch_size,
            state: SchedulerState::Idle,
        })
    }

    /// Scheduler already running, with its next batch at `start`
    pub fn resume_at(run_count: usize, batch_size: usize, start: usize) -> Result<Self, EnsembleError> {
        let mut scheduler = Self::new(run_count, batch_size)?;
        scheduler.state = if start < run_count {
            SchedulerState::Running { start }
        } else {
            SchedulerState::Finalizing
        };
        Ok(scheduler)
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Leave `Idle`. No effect in any other state.
    pub fn begin(&mut self) {
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Running { start: 0 };
        }
    }

    /// Runs of the next batch, while running
    pub fn next_batch(&self) -> Option<Range<usize>> {
        match self.state {
            SchedulerState::Running { start } => {
                Some(start..start.saturating_add(self.batch_size).min(self.run_count))
            }
            _ => None,
        }
    }

    /// Mark the current batch recorded and advance
    pub fn complete_batch(&mut self) -> SchedulerState {
        if let Some(batch) = self.next_batch() {
            self.state = if batch.end < self.run_count {
                SchedulerState::Running { start: batch.end }
            } else {
                SchedulerState::Finalizing
            };
        }
        self.state
    }

    /// `Finalizing → Done`
    pub fn finish(&mut self) {
        if self.state == SchedulerState::Finalizing {
            self.state = SchedulerState::Done;
        }
    }

    /// Runs covered by completed batches
    pub fn completed_runs(&self) -> usize {
        match self.state {
            SchedulerState::Idle => 0,
            SchedulerState::Running { start } => start,
            SchedulerState::Finalizing | SchedulerState::Done => self.run_count,
        }
    }
}

/// Every batch range from `start` to the end, in order
///
/// # Example
/// ```
/// use throughput_forecast_core_rs::orchestrator::scheduler::batch_ranges;
///
/// let batches: Vec<_> = batch_ranges(6, 3, 0).collect();
/// assert_eq!(batches, vec![0..3, 3..6]);
/// ```
pub fn batch_ranges(run_count: usize, batch_size: usize, start: usize) -> impl Iterator<Item = Range<usize>> {
    let step = batch_size.max(1);
    (start..run_count)
        .step_by(step)
        .map(move |first| first..first.saturating_add(step).min(run_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_partition() {
        let mut scheduler = BatchScheduler::new(6, 3).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.next_batch(), None);

        scheduler.begin();
        assert_eq!(scheduler.next_batch(), Some(0..3));
        assert_eq!(scheduler.complete_batch(), SchedulerState::Running { start: 3 });
        assert_eq!(scheduler.next_batch(), Some(3..6));
        assert_eq!(scheduler.complete_batch(), SchedulerState::Finalizing);
        assert_eq!(scheduler.completed_runs(), 6);

        scheduler.finish();
        assert_eq!(scheduler.state(), SchedulerState::Done);
    }

    #[test]
    fn test_resume_mid_ensemble() {
        let mut scheduler = BatchScheduler::resume_at(6, 2, 3).unwrap();
        assert_eq!(scheduler.next_batch(), Some(3..5));
        assert_eq!(scheduler.complete_batch(), SchedulerState::Running { start: 5 });
        assert_eq!(scheduler.next_batch(), Some(5..6));
        assert_eq!(scheduler.complete_batch(), SchedulerState::Finalizing);
    }

    #[test]
    fn test_exact_multiple_goes_straight_to_finalizing() {
        let mut scheduler = BatchScheduler::new(4, 4).unwrap();
        scheduler.begin();
        assert_eq!(scheduler.next_batch(), Some(0..4));
        assert_eq!(scheduler.complete_batch(), SchedulerState::Finalizing);
    }

    #[test]
    fn test_batch_larger_than_runs() {
        let mut scheduler = BatchScheduler::new(3, 100).unwrap();
        scheduler.begin();
        assert_eq!(scheduler.next_batch(), Some(0..3));
    }

    #[test]
    fn test_zero_counts_rejected() {
        assert!(matches!(
            BatchScheduler::new(0, 5),
            Err(EnsembleError::Configuration(_))
        ));
        assert!(matches!(
            BatchScheduler::from_config(&EnsembleConfig::default()),
            Err(EnsembleError::Configuration(_))
        ));
    }

    #[test]
    fn test_batch_ranges_from_offset() {
        let batches: Vec<_> = batch_ranges(6, 2, 3).collect();
        assert_eq!(batches, vec![3..5, 5..6]);
        assert_eq!(batch_ranges(1000, 100, 0).count(), 10);
    }
}
