//! Progress reporting
//!
//! The generator reports `(completed, total)` after every batch through a
//! [`ProgressObserver`]. [`LoadingTracker`] is the observer hosts usually
//! want: keyed loading flags and messages, where a message is only visible
//! while its key is loading.

use std::collections::{BTreeMap, BTreeSet};

/// Loading key used by ensemble generation
pub const ENSEMBLE_LOADING_KEY: &str = "createEnsemble";

/// Receives generation progress
pub trait ProgressObserver {
    /// Called once when a generation leaves `Idle`
    fn on_generation_started(&mut self, _total: usize) {}

    /// Called after every batch
    fn on_batch_complete(&mut self, completed: usize, total: usize);

    /// Called once the sorted snapshot is built
    fn on_generation_finished(&mut self) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_batch_complete(&mut self, _completed: usize, _total: usize) {}
}

/// Progress message shown while an ensemble is generating
pub fn ensemble_progress_message(completed: usize, total: usize) -> String {
    format!(
        "Generating ensemble: {} of {} simulations complete.",
        completed, total
    )
}

/// Keyed loading flags and messages
///
/// # Example
///
/// ```rust
/// use throughput_forecast_core_rs::progress::LoadingTracker;
///
/// let mut loading = LoadingTracker::new();
/// loading.record_loading_start("import");
/// loading.set_loading_message("import", "Reading file");
/// assert!(loading.is_loading());
/// assert_eq!(loading.loading_messages().get("import").map(String::as_str), Some("Reading file"));
///
/// loading.record_loading_end("import");
/// assert!(!loading.is_loading());
/// assert!(loading.loading_messages().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoadingTracker {
    flags: BTreeSet<String>,
    messages: BTreeMap<String, String>,
}

impl LoadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_loading_start(&mut self, key: &str) {
        self.flags.insert(key.to_string());
    }

    pub fn record_loading_end(&mut self, key: &str) {
        self.flags.remove(key);
    }

    pub fn set_loading_message(&mut self, key: &str, message: impl Into<String>) {
        self.messages.insert(key.to_string(), message.into());
    }

    pub fn remove_loading_message(&mut self, key: &str) {
        self.messages.remove(key);
    }

    pub fn is_loading(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Messages of keys currently loading, in key order
    pub fn loading_messages(&self) -> BTreeMap<String, String> {
        self.flags
            .iter()
            .filter_map(|key| {
                self.messages
                    .get(key)
                    .map(|message| (key.clone(), message.clone()))
            })
            .collect()
    }
}

impl ProgressObserver for LoadingTracker {
    fn on_generation_started(&mut self, total: usize) {
        self.record_loading_start(ENSEMBLE_LOADING_KEY);
        self.set_loading_message(ENSEMBLE_LOADING_KEY, ensemble_progress_message(0, total));
    }

    fn on_batch_complete(&mut self, completed: usize, total: usize) {
        self.set_loading_message(
            ENSEMBLE_LOADING_KEY,
            ensemble_progress_message(completed, total),
        );
    }

    fn on_generation_finished(&mut self) {
        self.remove_loading_message(ENSEMBLE_LOADING_KEY);
        self.record_loading_end(ENSEMBLE_LOADING_KEY);
    }
}
