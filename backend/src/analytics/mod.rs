//! Percentile / distribution query engine
//!
//! Pure queries over a finalized ensemble. An [`EnsembleView`] can only be
//! obtained from a generator whose ensemble has a generated timestamp, so
//! nothing here ever observes a partially filled or unsorted snapshot.

pub mod distribution;
pub mod forecast;
pub mod percentile;

pub use distribution::{cumulative, first_passage_distribution, milestone_met_distribution};
pub use forecast::{
    forecast_at, forecasts_by_percentiles, iterative_forecasts_by_percentiles, PercentileSeries,
    DEFAULT_PERCENTILES,
};
pub use percentile::{chance_of_reaching, conservative_percentile};

use crate::models::{ProgressionByPeriod, SortedProgression};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only view of a generated ensemble
#[derive(Debug, Clone, Copy)]
pub struct EnsembleView<'a> {
    pub(crate) generation_id: Option<Uuid>,
    pub(crate) milestone: Option<u64>,
    pub(crate) simulation_periods: usize,
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) progression: &'a ProgressionByPeriod,
    pub(crate) sorted: &'a SortedProgression,
}

impl<'a> EnsembleView<'a> {
    pub fn generation_id(&self) -> Option<Uuid> {
        self.generation_id
    }

    pub fn milestone(&self) -> Option<u64> {
        self.milestone
    }

    pub fn simulation_periods(&self) -> usize {
        self.simulation_periods
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn run_count(&self) -> usize {
        self.progression.completed_runs()
    }

    pub fn sorted(&self) -> &'a SortedProgression {
        self.sorted
    }

    pub fn progression(&self) -> &'a ProgressionByPeriod {
        self.progression
    }

    /// Conservative percentile of one period (`None` when it has no data)
    pub fn conservative_percentile_at_period(&self, period: usize, fraction: f64) -> Option<u64> {
        self.sorted
            .period(period)
            .and_then(|sorted| conservative_percentile(sorted, fraction))
    }

    /// Share of runs at or above the milestone at `period`.
    ///
    /// `None` when the period has no data or no milestone is set.
    pub fn chance_of_achieving_milestone_by_period(&self, period: usize) -> Option<f64> {
        let milestone = self.milestone?;
        self.sorted
            .period(period)
            .and_then(|sorted| chance_of_reaching(sorted, milestone))
    }

    /// Whether any run reached the milestone by the final period
    pub fn is_milestone_achievement_simulated(&self) -> bool {
        match (self.milestone, self.sorted.last_period().and_then(|p| p.last())) {
            (Some(milestone), Some(max)) => *max >= milestone,
            _ => false,
        }
    }

    pub fn forecasts_by_percentiles(&self, percentiles: &[u8]) -> Vec<PercentileSeries> {
        forecasts_by_percentiles(self.sorted, percentiles)
    }

    pub fn iterative_forecasts_by_percentiles(&self, percentiles: &[u8]) -> Vec<PercentileSeries> {
        iterative_forecasts_by_percentiles(self.sorted, percentiles)
    }

    /// Per-period percentage of runs at or above the milestone
    pub fn milestone_met_distribution(&self) -> Option<Vec<f64>> {
        self.milestone
            .map(|milestone| milestone_met_distribution(self.sorted, milestone))
    }

    /// Per-period percentage of runs first reaching the milestone
    pub fn first_passage_distribution(&self) -> Option<Vec<f64>> {
        self.milestone
            .map(|milestone| first_passage_distribution(self.progression, milestone))
    }

    /// Everything a presentation layer needs, in one serializable value
    pub fn summary(&self, percentiles: &[u8]) -> ForecastSummary {
        ForecastSummary {
            generation_id: self.generation_id,
            milestone: self.milestone,
            simulation_periods: self.simulation_periods,
            run_count: self.run_count(),
            generated_timestamp: self.generated_at,
            milestone_achievement_simulated: self.is_milestone_achievement_simulated(),
            chance_of_milestone_by_period: (0..self.simulation_periods)
                .map(|period| self.chance_of_achieving_milestone_by_period(period))
                .collect(),
            forecasts: self.forecasts_by_percentiles(percentiles),
        }
    }
}

/// Serializable digest of a generated ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummary {
    pub generation_id: Option<Uuid>,
    pub milestone: Option<u64>,
    pub simulation_periods: usize,
    pub run_count: usize,
    pub generated_timestamp: DateTime<Utc>,
    pub milestone_achievement_simulated: bool,
    pub chance_of_milestone_by_period: Vec<Option<f64>>,
    pub forecasts: Vec<PercentileSeries>,
}
