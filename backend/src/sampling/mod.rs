//! Random draw source
//!
//! Bootstrap resampling: each draw picks one historical value uniformly at
//! random, with replacement, as `sample[floor(random() × len)]`.
//!
//! The engine talks to draws only through [`DrawSource`], so tests can swap
//! in a scripted sequence.

use crate::error::EnsembleError;
use crate::models::HistoricalSample;
use crate::rng::RngManager;

/// Source of per-period outcomes for one simulation run
///
/// # Example
///
/// ```rust
/// use throughput_forecast_core_rs::sampling::DrawSource;
/// use throughput_forecast_core_rs::EnsembleError;
///
/// struct AlwaysFive;
///
/// impl DrawSource for AlwaysFive {
///     fn draw(&mut self) -> Result<u32, EnsembleError> {
///         Ok(5)
///     }
/// }
///
/// assert_eq!(AlwaysFive.draw().unwrap(), 5);
/// ```
pub trait DrawSource {
    /// Draw one outcome
    ///
    /// Fails with [`EnsembleError::Validation`] when there is nothing to
    /// draw from.
    fn draw(&mut self) -> Result<u32, EnsembleError>;
}

/// Uniform draw with replacement from a historical sample
#[derive(Debug, Clone)]
pub struct BootstrapSampler {
    sample: HistoricalSample,
    rng: RngManager,
}

impl BootstrapSampler {
    pub fn new(sample: HistoricalSample, rng: RngManager) -> Self {
        Self { sample, rng }
    }

    /// Sampler for one run, seeded from the ensemble seed and run index
    pub fn for_run(sample: &HistoricalSample, seed: u64, run_index: usize) -> Self {
        Self::new(sample.clone(), RngManager::for_run(seed, run_index))
    }

    pub fn sample(&self) -> &HistoricalSample {
        &self.sample
    }
}

impl DrawSource for BootstrapSampler {
    fn draw(&mut self) -> Result<u32, EnsembleError> {
        if self.sample.is_empty() {
            return Err(EnsembleError::Validation(
                "historical data is required in order to draw".to_string(),
            ));
        }
        let index = self.rng.index_below(self.sample.len());
        Ok(self.sample.values()[index])
    }
}
