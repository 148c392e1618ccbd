//! Ensemble Generator
//!
//! Owns the ensemble store and drives generation through the batch
//! scheduler:
//!
//! ```text
//! start_generation:
//! 1. Check configuration (run count, batch size)   → nothing mutated on error
//! 2. Check inputs (period count, historical sample) → nothing mutated on error
//! 3. Reset derived state, bump the epoch
//! 4. Capture inputs, create P empty period arrays
//!
//! run_batch (repeated):
//! 5. Reject stale jobs
//! 6. Execute runs [start, min(start + B, N))
//! 7. Report (completed, total) to the observer
//! 8. On the last batch: sort a copy, stamp the timestamp, persist
//! ```
//!
//! # Example
//!
//! ```rust
//! use throughput_forecast_core_rs::{EnsembleConfig, EnsembleGenerator, SimulationInputs};
//! use throughput_forecast_core_rs::progress::NoopProgress;
//!
//! let mut generator = EnsembleGenerator::new(EnsembleConfig::new(1000, 100).with_seed(7));
//! let inputs = SimulationInputs::new(15, 3, vec![0, 10]);
//!
//! let mut job = generator.start_generation(&inputs, &mut NoopProgress).unwrap();
//! while !job.is_done() {
//!     generator.run_batch(&mut job, &mut NoopProgress).unwrap();
//! }
//!
//! assert!(generator.is_generated());
//! assert_eq!(generator.completed_simulation_count(), 1000);
//! ```

use crate::analytics::EnsembleView;
use crate::config::{EnsembleConfig, ExecutionMode};
use crate::core::{Clock, SystemClock};
use crate::error::EnsembleError;
use crate::models::{
    Event, EventLog, HistoricalSample, ProgressionByPeriod, SimulationInputs, SortedProgression,
};
use crate::orchestrator::checkpoint::{
    read_snapshot, same_shape, write_snapshot, EnsembleSnapshot, LoadReport,
};
use crate::orchestrator::executor::execute_runs;
use crate::orchestrator::scheduler::{BatchScheduler, SchedulerState};
use crate::persistence::{MemoryStore, PersistenceAdapter};
use crate::progress::ProgressObserver;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// Generation Job
// ============================================================================

/// Handle to one in-flight generation.
///
/// Returned by [`EnsembleGenerator::start_generation`]. The job carries the
/// epoch it was started in; once the generator moves to a later epoch the
/// job is stale and every further batch is refused.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    epoch: u64,
    seed: u64,
    scheduler: BatchScheduler,
    execution: ExecutionMode,
}

impl GenerationJob {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Seed of the per-run random streams
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn completed_runs(&self) -> usize {
        self.scheduler.completed_runs()
    }

    pub fn total_runs(&self) -> usize {
        self.scheduler.run_count()
    }

    pub fn is_done(&self) -> bool {
        self.scheduler.state() == SchedulerState::Done
    }
}

/// Seed derived from a generation id when none is configured
fn seed_from_generation_id(id: Uuid) -> u64 {
    let bits = id.as_u128();
    (bits >> 64) as u64 ^ bits as u64
}

// ============================================================================
// Ensemble Generator
// ============================================================================

/// Bootstrap Monte Carlo ensemble generator
///
/// Holds the sticky configuration, the captured inputs of the current
/// ensemble and its progression arrays. Queries only answer once the
/// ensemble has a generated timestamp.
pub struct EnsembleGenerator {
    /// Sticky run count, batch size, seed and execution mode
    config: EnsembleConfig,

    /// Incremented by every generation start, reset and load
    epoch: u64,

    generation_id: Option<Uuid>,
    milestone: Option<u64>,
    simulation_periods: Option<usize>,
    historical_data: HistoricalSample,

    /// Cumulative totals `[period][run]`, filled batch by batch
    progression: ProgressionByPeriod,

    /// Sorted copy, built once all runs are recorded
    sorted: SortedProgression,

    /// Set at finalization; absent means "not generated"
    generated_timestamp: Option<DateTime<Utc>>,

    clock: Box<dyn Clock>,
    persistence: Box<dyn PersistenceAdapter>,
    event_log: EventLog,
}

impl std::fmt::Debug for EnsembleGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleGenerator")
            .field("config", &self.config)
            .field("epoch", &self.epoch)
            .field("generation_id", &self.generation_id)
            .field("milestone", &self.milestone)
            .field("simulation_periods", &self.simulation_periods)
            .field("completed_runs", &self.progression.completed_runs())
            .field("generated_timestamp", &self.generated_timestamp)
            .finish()
    }
}

impl Default for EnsembleGenerator {
    fn default() -> Self {
        Self::new(EnsembleConfig::default())
    }
}

impl EnsembleGenerator {
    /// Create a generator with an in-memory store and the system clock
    pub fn new(config: EnsembleConfig) -> Self {
        Self {
            config,
            epoch: 0,
            generation_id: None,
            milestone: None,
            simulation_periods: None,
            historical_data: HistoricalSample::default(),
            progression: ProgressionByPeriod::default(),
            sorted: SortedProgression::default(),
            generated_timestamp: None,
            clock: Box::new(SystemClock),
            persistence: Box::new(MemoryStore::new()),
            event_log: EventLog::new(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_persistence(mut self, persistence: Box<dyn PersistenceAdapter>) -> Self {
        self.persistence = persistence;
        self
    }

    // ========================================================================
    // Sticky configuration
    // ========================================================================

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn set_run_count(&mut self, run_count: usize) {
        self.config.run_count = Some(run_count);
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.config.batch_size = Some(batch_size);
    }

    /// Set the run count from free text (unparsable or ≤ 0 → 1)
    pub fn set_run_count_text(&mut self, raw: &str) {
        self.config.set_run_count_text(raw);
    }

    /// Set the batch size from free text (unparsable or ≤ 0 → 1)
    pub fn set_batch_size_text(&mut self, raw: &str) {
        self.config.set_batch_size_text(raw);
    }

    pub fn set_rng_seed(&mut self, seed: Option<u64>) {
        self.config.rng_seed = seed;
    }

    pub fn set_execution(&mut self, execution: ExecutionMode) {
        self.config.execution = execution;
    }

    // ========================================================================
    // Generation
    // ========================================================================

    /// Start a new generation over `inputs`.
    ///
    /// Configuration and inputs are checked before anything is touched, so
    /// a failed start leaves the previous ensemble intact. On success every
    /// earlier job becomes stale.
    pub fn start_generation(
        &mut self,
        inputs: &SimulationInputs,
        observer: &mut dyn ProgressObserver,
    ) -> Result<GenerationJob, EnsembleError> {
        let mut scheduler = BatchScheduler::from_config(&self.config)?;

        if inputs.simulation_periods < 1 {
            return Err(EnsembleError::Validation(
                "a positive simulation periods value is required in order to run a simulation"
                    .to_string(),
            ));
        }
        if inputs.historical_data.is_empty() {
            return Err(EnsembleError::Validation(
                "historical data is required in order to run a simulation".to_string(),
            ));
        }

        self.invalidate();

        let generation_id = Uuid::new_v4();
        let seed = self
            .config
            .rng_seed
            .unwrap_or_else(|| seed_from_generation_id(generation_id));
        let run_count = scheduler.run_count();

        self.generation_id = Some(generation_id);
        self.milestone = Some(inputs.milestone).filter(|m| *m > 0);
        self.simulation_periods = Some(inputs.simulation_periods);
        self.historical_data = inputs.sample();
        self.progression = ProgressionByPeriod::with_periods(inputs.simulation_periods, run_count);

        scheduler.begin();
        observer.on_generation_started(run_count);

        self.event_log.log(Event::GenerationStarted {
            epoch: self.epoch,
            generation_id,
            run_count,
            batch_size: scheduler.batch_size(),
            simulation_periods: inputs.simulation_periods,
        });
        info!(
            epoch = self.epoch,
            %generation_id,
            run_count,
            batch_size = scheduler.batch_size(),
            simulation_periods = inputs.simulation_periods,
            sample_len = self.historical_data.len(),
            "ensemble generation started"
        );

        Ok(GenerationJob {
            epoch: self.epoch,
            seed,
            scheduler,
            execution: self.config.execution,
        })
    }

    /// Execute the next batch of `job` and return where it now stands.
    ///
    /// The batch that records the last run also finalizes the ensemble, so
    /// the call returns [`SchedulerState::Done`].
    pub fn run_batch(
        &mut self,
        job: &mut GenerationJob,
        observer: &mut dyn ProgressObserver,
    ) -> Result<SchedulerState, EnsembleError> {
        if job.epoch != self.epoch {
            warn!(
                job_epoch = job.epoch,
                current_epoch = self.epoch,
                "rejecting batch from superseded generation"
            );
            self.event_log.log(Event::StaleJobRejected {
                epoch: job.epoch,
                current_epoch: self.epoch,
            });
            return Err(EnsembleError::StaleGeneration {
                job_epoch: job.epoch,
                current_epoch: self.epoch,
            });
        }

        if job.scheduler.state() == SchedulerState::Done {
            return Err(EnsembleError::GenerationComplete { epoch: job.epoch });
        }
        job.scheduler.begin();

        if let Some(batch) = job.scheduler.next_batch() {
            execute_runs(
                &mut self.progression,
                &self.historical_data,
                job.seed,
                batch.clone(),
                job.execution,
            )?;

            job.scheduler.complete_batch();
            let completed = job.scheduler.completed_runs();
            let total = job.scheduler.run_count();
            observer.on_batch_complete(completed, total);

            self.event_log.log(Event::BatchCompleted {
                epoch: self.epoch,
                start: batch.start,
                end: batch.end,
                completed,
                total,
            });
            debug!(epoch = self.epoch, start = batch.start, end = batch.end, completed, total, "batch complete");
        }

        if job.scheduler.state() == SchedulerState::Finalizing {
            self.finalize(job, observer)?;
        }

        Ok(job.scheduler.state())
    }

    /// Run every remaining batch of `job`
    pub fn drive_to_completion(
        &mut self,
        job: &mut GenerationJob,
        observer: &mut dyn ProgressObserver,
    ) -> Result<(), EnsembleError> {
        while self.run_batch(job, observer)? != SchedulerState::Done {}
        Ok(())
    }

    /// Start a generation and run it to completion
    pub fn generate(
        &mut self,
        inputs: &SimulationInputs,
        observer: &mut dyn ProgressObserver,
    ) -> Result<(), EnsembleError> {
        let mut job = self.start_generation(inputs, observer)?;
        self.drive_to_completion(&mut job, observer)
    }

    fn finalize(
        &mut self,
        job: &mut GenerationJob,
        observer: &mut dyn ProgressObserver,
    ) -> Result<(), EnsembleError> {
        self.sorted = match job.execution {
            ExecutionMode::Sequential => self.progression.sorted(),
            ExecutionMode::Parallel => self.progression.par_sorted(),
        };
        let generated_at = self.clock.now();
        self.generated_timestamp = Some(generated_at);
        job.scheduler.finish();
        observer.on_generation_finished();

        self.event_log.log(Event::Finalized {
            epoch: self.epoch,
            generated_at,
        });
        info!(
            epoch = self.epoch,
            runs = self.progression.completed_runs(),
            %generated_at,
            "ensemble finalized"
        );

        self.save()
    }

    /// Wipe the ensemble and its captured inputs. Run count and batch size
    /// are kept.
    pub fn reset(&mut self) {
        self.invalidate();
        self.event_log.log(Event::Reset { epoch: self.epoch });
        info!(epoch = self.epoch, "ensemble reset");
    }

    /// Clear everything but the configuration and move to a new epoch
    fn invalidate(&mut self) {
        self.epoch += 1;
        self.generation_id = None;
        self.milestone = None;
        self.simulation_periods = None;
        self.historical_data = HistoricalSample::default();
        self.progression = ProgressionByPeriod::default();
        self.sorted = SortedProgression::default();
        self.generated_timestamp = None;
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn generation_id(&self) -> Option<Uuid> {
        self.generation_id
    }

    /// Runs recorded in every period so far
    pub fn completed_simulation_count(&self) -> usize {
        self.progression.completed_runs()
    }

    pub fn is_generated(&self) -> bool {
        self.generated_timestamp.is_some()
    }

    pub fn generated_timestamp(&self) -> Option<DateTime<Utc>> {
        self.generated_timestamp
    }

    pub fn milestone(&self) -> Option<u64> {
        self.milestone
    }

    pub fn simulation_periods(&self) -> Option<usize> {
        self.simulation_periods
    }

    pub fn historical_data(&self) -> &HistoricalSample {
        &self.historical_data
    }

    pub fn progression(&self) -> &ProgressionByPeriod {
        &self.progression
    }

    pub fn sorted_progression(&self) -> &SortedProgression {
        &self.sorted
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Query view of the ensemble, once it is generated
    pub fn view(&self) -> Option<EnsembleView<'_>> {
        let generated_at = self.generated_timestamp?;
        Some(EnsembleView {
            generation_id: self.generation_id,
            milestone: self.milestone,
            simulation_periods: self
                .simulation_periods
                .unwrap_or_else(|| self.sorted.period_count()),
            generated_at,
            progression: &self.progression,
            sorted: &self.sorted,
        })
    }

    /// Conservative percentile at `period`; `None` until generated
    pub fn conservatively_percentiled_progression_at_period(
        &self,
        period: usize,
        fraction: f64,
    ) -> Option<u64> {
        self.view()?.conservative_percentile_at_period(period, fraction)
    }

    /// Chance of reaching the milestone by `period`; `None` until generated
    pub fn chance_of_achieving_milestone_by_period(&self, period: usize) -> Option<f64> {
        self.view()?.chance_of_achieving_milestone_by_period(period)
    }

    pub fn is_milestone_achievement_simulated(&self) -> bool {
        self.view()
            .is_some_and(|view| view.is_milestone_achievement_simulated())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    fn snapshot(&self) -> EnsembleSnapshot {
        let generated = self.is_generated();
        EnsembleSnapshot {
            milestone: self.milestone,
            simulation_periods: self.simulation_periods,
            historical_data: (!self.historical_data.is_empty())
                .then(|| self.historical_data.values().to_vec()),
            progression: generated.then(|| self.progression.clone()),
            sorted_progression: generated.then(|| self.sorted.clone()),
            generated_timestamp: self.generated_timestamp,
            generation_id: self.generation_id,
            run_count: self.config.run_count,
            batch_size: self.config.batch_size,
        }
    }

    /// Persist the current state through the configured adapter
    pub fn save(&mut self) -> Result<(), EnsembleError> {
        let snapshot = self.snapshot();
        write_snapshot(self.persistence.as_mut(), &snapshot)
    }

    /// Persist the current state through another adapter
    pub fn save_to(&self, adapter: &mut dyn PersistenceAdapter) -> Result<(), EnsembleError> {
        write_snapshot(adapter, &self.snapshot())
    }

    /// Restore state from the configured adapter
    pub fn load(&mut self) -> Result<LoadReport, EnsembleError> {
        let (snapshot, report) = read_snapshot(self.persistence.as_ref())?;
        self.apply_snapshot(snapshot);
        Ok(report)
    }

    /// Restore state from another adapter.
    ///
    /// Missing keys leave their field untouched; malformed ones are listed
    /// in the report and also leave their field untouched. Any in-flight job
    /// becomes stale.
    pub fn load_from(&mut self, adapter: &dyn PersistenceAdapter) -> Result<LoadReport, EnsembleError> {
        let (snapshot, report) = read_snapshot(adapter)?;
        self.apply_snapshot(snapshot);
        Ok(report)
    }

    fn apply_snapshot(&mut self, snapshot: EnsembleSnapshot) {
        self.epoch += 1;

        if let Some(milestone) = snapshot.milestone {
            self.milestone = Some(milestone).filter(|m| *m > 0);
        }
        if let Some(periods) = snapshot.simulation_periods {
            self.simulation_periods = Some(periods);
        }
        if let Some(data) = snapshot.historical_data {
            self.historical_data = HistoricalSample::new(data);
        }
        if let Some(progression) = snapshot.progression {
            self.progression = progression;
        }
        if let Some(sorted) = snapshot.sorted_progression {
            self.sorted = sorted;
        }
        if let Some(generated_at) = snapshot.generated_timestamp {
            self.generated_timestamp = Some(generated_at);
        }
        if let Some(id) = snapshot.generation_id {
            self.generation_id = Some(id);
        }
        if let Some(run_count) = snapshot.run_count {
            self.config.run_count = Some(run_count);
        }
        if let Some(batch_size) = snapshot.batch_size {
            self.config.batch_size = Some(batch_size);
        }

        // A timestamp only stands for a complete, sorted ensemble
        if self.generated_timestamp.is_some()
            && (self.sorted.is_empty() || !same_shape(&self.progression, &self.sorted))
        {
            warn!(epoch = self.epoch, "restored timestamp without a matching sorted ensemble");
            self.generated_timestamp = None;
        }

        info!(
            epoch = self.epoch,
            generated = self.is_generated(),
            runs = self.progression.completed_runs(),
            "ensemble state loaded"
        );
    }
}
