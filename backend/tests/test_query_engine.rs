//! Tests for percentile and distribution queries
//!
//! Pure queries over sorted snapshots, plus the generator's query surface.

use throughput_forecast_core_rs::analytics::{
    chance_of_reaching, conservative_percentile, cumulative, forecasts_by_percentiles,
    iterative_forecasts_by_percentiles, milestone_met_distribution,
};
use throughput_forecast_core_rs::{
    EnsembleConfig, EnsembleGenerator, NoopProgress, SimulationInputs, SortedProgression,
};

const SORTED: [u64; 5] = [1, 2, 7, 9, 9];

// ============================================================================
// Conservative percentile
// ============================================================================

#[test]
fn test_conservative_percentile_concrete_values() {
    assert_eq!(conservative_percentile(&SORTED, 0.0), Some(1));
    assert_eq!(conservative_percentile(&SORTED, 0.39), Some(1));
    assert_eq!(conservative_percentile(&SORTED, 0.4), Some(2));
    assert_eq!(conservative_percentile(&SORTED, 1.0), Some(9));
}

#[test]
fn test_conservative_percentile_never_interpolates() {
    for step in 0..=100 {
        let value = conservative_percentile(&SORTED, step as f64 / 100.0).unwrap();
        assert!(SORTED.contains(&value));
    }
}

#[test]
fn test_conservative_percentile_out_of_range_fractions() {
    assert_eq!(conservative_percentile(&SORTED, -0.5), Some(1));
    assert_eq!(conservative_percentile(&SORTED, 3.0), Some(9));
    assert_eq!(conservative_percentile(&SORTED, f64::NAN), Some(1));
    assert_eq!(conservative_percentile(&[], 0.5), None);
}

// ============================================================================
// Milestone likelihood
// ============================================================================

#[test]
fn test_chance_of_reaching_concrete_values() {
    assert_eq!(chance_of_reaching(&SORTED, 9), Some(0.4));
    assert_eq!(chance_of_reaching(&SORTED, 1), Some(1.0));
    assert_eq!(chance_of_reaching(&SORTED, 10), Some(0.0));
    assert_eq!(chance_of_reaching(&[], 3), None);
}

#[test]
fn test_met_distribution_is_percentage_of_chance() {
    let sorted = SortedProgression::from_periods(vec![SORTED.to_vec(), vec![2, 7, 9, 9, 12]]).unwrap();
    assert_eq!(milestone_met_distribution(&sorted, 9), vec![40.0, 60.0]);
}

// ============================================================================
// Forecast series
// ============================================================================

#[test]
fn test_forecasts_keep_requested_order() {
    let sorted = SortedProgression::from_periods(vec![(1..=10).collect(), (11..=20).collect()]).unwrap();
    let series = forecasts_by_percentiles(&sorted, &[10, 90, 50]);

    let labels: Vec<u8> = series.iter().map(|s| s.percentile).collect();
    assert_eq!(labels, vec![10, 90, 50]);
    assert_eq!(series[0].values, vec![9, 19]);
    assert_eq!(series[1].values, vec![1, 11]);
    assert_eq!(series[2].values, vec![5, 15]);
}

#[test]
fn test_iterative_bands_stack_to_forecasts() {
    let sorted = SortedProgression::from_periods(vec![(1..=10).collect(), (11..=20).collect()]).unwrap();
    let bands = iterative_forecasts_by_percentiles(&sorted, &[10, 50, 90, 50]);
    let forecasts = forecasts_by_percentiles(&sorted, &[90, 50, 10]);

    let labels: Vec<u8> = bands.iter().map(|s| s.percentile).collect();
    assert_eq!(labels, vec![90, 50, 10]);
    assert_eq!(bands[0].values, forecasts[0].values);

    for period in 0..2 {
        let mut running = 0;
        for (band, forecast) in bands.iter().zip(&forecasts) {
            running += band.values[period];
            assert_eq!(running, forecast.values[period]);
        }
    }
}

// ============================================================================
// Generator query surface
// ============================================================================

#[test]
fn test_generator_summary() {
    let mut generator = EnsembleGenerator::new(EnsembleConfig::new(200, 50).with_seed(9));
    generator
        .generate(&SimulationInputs::new(20, 4, vec![2, 5, 8]), &mut NoopProgress)
        .unwrap();

    let view = generator.view().unwrap();
    let summary = view.summary(&[90, 50, 10]);
    assert_eq!(summary.milestone, Some(20));
    assert_eq!(summary.simulation_periods, 4);
    assert_eq!(summary.run_count, 200);
    assert_eq!(summary.chance_of_milestone_by_period.len(), 4);
    assert_eq!(summary.forecasts.len(), 3);
    assert_eq!(Some(summary.generated_timestamp), generator.generated_timestamp());

    // Period 0 is at most 8, period 3 at least 8
    assert_eq!(summary.chance_of_milestone_by_period[0], Some(0.0));
    assert_eq!(
        generator.conservatively_percentiled_progression_at_period(3, 0.0),
        view.sorted().period(3).and_then(|p| p.first().copied())
    );

    let json = serde_json::to_value(&summary).unwrap();
    assert!(json.get("chanceOfMilestoneByPeriod").is_some());
    assert!(json.get("generatedTimestamp").is_some());
}

#[test]
fn test_met_and_first_passage_agree_on_generated_ensemble() {
    let mut generator = EnsembleGenerator::new(EnsembleConfig::new(500, 100).with_seed(3));
    generator
        .generate(&SimulationInputs::new(30, 6, vec![0, 4, 6, 11]), &mut NoopProgress)
        .unwrap();

    let view = generator.view().unwrap();
    let met = view.milestone_met_distribution().unwrap();
    let running = cumulative(&view.first_passage_distribution().unwrap());
    assert_eq!(met.len(), 6);
    for (a, b) in met.iter().zip(&running) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }
}

#[test]
fn test_milestone_never_reached() {
    let mut generator = EnsembleGenerator::new(EnsembleConfig::new(50, 50).with_seed(3));
    generator
        .generate(&SimulationInputs::new(1000, 2, vec![1, 2]), &mut NoopProgress)
        .unwrap();

    assert!(!generator.is_milestone_achievement_simulated());
    assert_eq!(generator.chance_of_achieving_milestone_by_period(1), Some(0.0));
}
