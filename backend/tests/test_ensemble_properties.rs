//! Property tests for ensemble invariants
//!
//! - Every run has exactly P non-decreasing cumulative totals
//! - Each step is a value of the historical sample
//! - Sorting is idempotent and leaves the source untouched
//! - Percentile boundaries hit the minimum and maximum
//! - Sequential and parallel execution agree

use proptest::prelude::*;
use throughput_forecast_core_rs::analytics::{chance_of_reaching, conservative_percentile};
use throughput_forecast_core_rs::{
    EnsembleConfig, EnsembleGenerator, ExecutionMode, NoopProgress, SimulationInputs,
};

fn generate(
    sample: Vec<u32>,
    periods: usize,
    runs: usize,
    batch: usize,
    seed: u64,
    execution: ExecutionMode,
) -> EnsembleGenerator {
    let mut generator = EnsembleGenerator::new(
        EnsembleConfig::new(runs, batch)
            .with_seed(seed)
            .with_execution(execution),
    );
    generator
        .generate(&SimulationInputs::new(10, periods, sample), &mut NoopProgress)
        .unwrap();
    generator
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_runs_are_cumulative_draws(
        sample in prop::collection::vec(0u32..50, 1..8),
        periods in 1usize..8,
        runs in 1usize..40,
        batch in 1usize..16,
        seed in any::<u64>(),
    ) {
        let generator = generate(sample.clone(), periods, runs, batch, seed, ExecutionMode::Sequential);
        let progression = generator.progression();

        prop_assert_eq!(progression.period_count(), periods);
        prop_assert_eq!(progression.completed_runs(), runs);

        for run in 0..runs {
            let trajectory = progression.trajectory(run).unwrap();
            prop_assert_eq!(trajectory.len(), periods);

            let mut previous = 0u64;
            for total in trajectory {
                prop_assert!(total >= previous);
                let step = u32::try_from(total - previous).unwrap();
                prop_assert!(sample.contains(&step));
                previous = total;
            }
        }
    }

    #[test]
    fn prop_sorting_is_idempotent_and_non_destructive(
        sample in prop::collection::vec(0u32..100, 1..6),
        periods in 1usize..5,
        runs in 1usize..30,
        seed in any::<u64>(),
    ) {
        let generator = generate(sample, periods, runs, 7, seed, ExecutionMode::Sequential);
        let before = generator.progression().clone();

        let first = generator.progression().sorted();
        let second = generator.progression().sorted();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(generator.progression(), &before);
        prop_assert_eq!(generator.sorted_progression(), &first);
    }

    #[test]
    fn prop_percentile_boundaries(mut values in prop::collection::vec(any::<u64>(), 1..64)) {
        values.sort_unstable();
        prop_assert_eq!(conservative_percentile(&values, 0.0), values.first().copied());
        prop_assert_eq!(conservative_percentile(&values, 1.0), values.last().copied());
    }

    #[test]
    fn prop_percentile_monotone_in_fraction(
        mut values in prop::collection::vec(0u64..1000, 1..64),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        values.sort_unstable();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(conservative_percentile(&values, low) <= conservative_percentile(&values, high));
    }

    #[test]
    fn prop_chance_within_unit_interval(
        mut values in prop::collection::vec(0u64..100, 1..64),
        milestone in 0u64..120,
    ) {
        values.sort_unstable();
        let chance = chance_of_reaching(&values, milestone).unwrap();
        prop_assert!((0.0..=1.0).contains(&chance));
        let expected = values.iter().filter(|v| **v >= milestone).count() as f64 / values.len() as f64;
        prop_assert!((chance - expected).abs() < 1e-12);
    }

    #[test]
    fn prop_parallel_matches_sequential(
        sample in prop::collection::vec(0u32..20, 1..6),
        periods in 1usize..6,
        runs in 1usize..60,
        batch in 1usize..20,
        seed in any::<u64>(),
    ) {
        let sequential = generate(sample.clone(), periods, runs, batch, seed, ExecutionMode::Sequential);
        let parallel = generate(sample, periods, runs, batch, seed, ExecutionMode::Parallel);
        prop_assert_eq!(sequential.progression(), parallel.progression());
        prop_assert_eq!(sequential.sorted_progression(), parallel.sorted_progression());
    }
}
