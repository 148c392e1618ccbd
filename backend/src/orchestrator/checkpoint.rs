//! Checkpoint - Save/Load Ensemble State
//!
//! Serializes every persisted field of the generator to its own key through
//! a [`PersistenceAdapter`], and reads them back field by field.
//!
//! # Critical Invariants
//!
//! - **Independent keys**: each field is written, cleared and restored on its
//!   own; an absent field removes its key
//! - **Missing keys are no-ops**: a key absent on load leaves the in-memory
//!   field untouched
//! - **Malformed keys are discarded**: a field that fails to parse or
//!   validate is reported as a [`DataIntegrityError`] and never applied
//! - **Inputs match**: derived arrays are only restored when the stored
//!   inputs digest matches the stored inputs

use crate::error::{DataIntegrityError, EnsembleError, PersistenceError};
use crate::models::{ProgressionByPeriod, SortedProgression};
use crate::persistence::{keys, PersistenceAdapter};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Snapshot Structure
// ============================================================================

/// Every persisted field of the generator.
///
/// `None` means "absent": on save the key is removed, on load the field was
/// missing or discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleSnapshot {
    pub milestone: Option<u64>,
    pub simulation_periods: Option<usize>,
    pub historical_data: Option<Vec<u32>>,
    pub progression: Option<ProgressionByPeriod>,
    pub sorted_progression: Option<SortedProgression>,
    pub generated_timestamp: Option<DateTime<Utc>>,
    pub generation_id: Option<Uuid>,
    pub run_count: Option<usize>,
    pub batch_size: Option<usize>,
}

/// Fields discarded while loading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub discarded: Vec<DataIntegrityError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.discarded.is_empty()
    }

    pub fn discard(&mut self, key: &str, reason: impl Into<String>) {
        let error = DataIntegrityError::new(key, reason);
        tracing::warn!(key = %error.key, reason = %error.reason, "discarding persisted field");
        self.discarded.push(error);
    }

    pub fn was_discarded(&self, key: &str) -> bool {
        self.discarded.iter().any(|e| e.key == key)
    }
}

// ============================================================================
// Inputs Hashing
// ============================================================================

/// SHA256 of the canonical JSON of the generation inputs.
///
/// Stored next to the progression arrays so a load can tell whether the
/// arrays were produced from the inputs stored beside them.
pub fn compute_inputs_digest(
    milestone: Option<u64>,
    simulation_periods: Option<usize>,
    historical_data: &[u32],
) -> Result<String, EnsembleError> {
    #[derive(Serialize)]
    struct DigestInputs<'a> {
        milestone: Option<u64>,
        simulation_periods: Option<usize>,
        historical_data: &'a [u32],
    }

    let json = serde_json::to_string(&DigestInputs {
        milestone,
        simulation_periods,
        historical_data,
    })
    .map_err(|e| PersistenceError::Serialization {
        key: keys::INPUTS_DIGEST.to_string(),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Save
// ============================================================================

fn encode<T: Serialize>(key: &str, value: &Option<T>) -> Result<Option<String>, EnsembleError> {
    value
        .as_ref()
        .map(|v| {
            serde_json::to_string(v).map_err(|e| {
                EnsembleError::Persistence(PersistenceError::Serialization {
                    key: key.to_string(),
                    source: e,
                })
            })
        })
        .transpose()
}

/// Write every field of `snapshot`; absent fields remove their key
pub fn write_snapshot(
    adapter: &mut dyn PersistenceAdapter,
    snapshot: &EnsembleSnapshot,
) -> Result<(), EnsembleError> {
    let digest = match &snapshot.historical_data {
        Some(data) => Some(compute_inputs_digest(
            snapshot.milestone,
            snapshot.simulation_periods,
            data,
        )?),
        None => None,
    };

    let entries = vec![
        (keys::MILESTONE, encode(keys::MILESTONE, &snapshot.milestone)?),
        (
            keys::SIMULATION_PERIODS,
            encode(keys::SIMULATION_PERIODS, &snapshot.simulation_periods)?,
        ),
        (
            keys::HISTORICAL_DATA,
            encode(keys::HISTORICAL_DATA, &snapshot.historical_data)?,
        ),
        (keys::PROGRESSION, encode(keys::PROGRESSION, &snapshot.progression)?),
        (
            keys::SORTED_PROGRESSION,
            encode(keys::SORTED_PROGRESSION, &snapshot.sorted_progression)?,
        ),
        (
            keys::GENERATED_TIMESTAMP,
            encode(keys::GENERATED_TIMESTAMP, &snapshot.generated_timestamp)?,
        ),
        (keys::GENERATION_ID, encode(keys::GENERATION_ID, &snapshot.generation_id)?),
        (keys::INPUTS_DIGEST, encode(keys::INPUTS_DIGEST, &digest)?),
        (keys::RUN_COUNT, encode(keys::RUN_COUNT, &snapshot.run_count)?),
        (keys::BATCH_SIZE, encode(keys::BATCH_SIZE, &snapshot.batch_size)?),
    ];

    adapter.write_all(entries)?;
    Ok(())
}

// ============================================================================
// Load
// ============================================================================

/// Decode one key from the values read for a load.
///
/// Missing → `None`. Unparsable → `None` plus a report entry.
fn decode<T: DeserializeOwned>(
    raw: &mut BTreeMap<String, String>,
    key: &str,
    report: &mut LoadReport,
) -> Option<T> {
    let text = raw.remove(key)?;
    match serde_json::from_str::<T>(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            report.discard(key, e.to_string());
            None
        }
    }
}

/// Read every persisted field, discarding those that are malformed or
/// inconsistent with the others.
///
/// The adapter is read once for all keys. Only I/O failures are returned as
/// errors; a store that is not a JSON object counts as every key malformed.
pub fn read_snapshot(
    adapter: &dyn PersistenceAdapter,
) -> Result<(EnsembleSnapshot, LoadReport), EnsembleError> {
    let mut report = LoadReport::default();

    let mut raw = match adapter.read_all(&keys::ALL_KEYS) {
        Ok(values) => values,
        Err(PersistenceError::CorruptStore { path }) => {
            for key in keys::ALL_KEYS {
                report.discard(key, format!("store {} is not a JSON object", path));
            }
            BTreeMap::new()
        }
        Err(e) => return Err(e.into()),
    };

    let mut snapshot = EnsembleSnapshot {
        milestone: decode(&mut raw, keys::MILESTONE, &mut report),
        simulation_periods: decode(&mut raw, keys::SIMULATION_PERIODS, &mut report),
        historical_data: decode(&mut raw, keys::HISTORICAL_DATA, &mut report),
        progression: decode::<Vec<Vec<u64>>>(&mut raw, keys::PROGRESSION, &mut report)
            .map(ProgressionByPeriod::from_periods),
        sorted_progression: None,
        generated_timestamp: decode(&mut raw, keys::GENERATED_TIMESTAMP, &mut report),
        generation_id: decode(&mut raw, keys::GENERATION_ID, &mut report),
        run_count: decode(&mut raw, keys::RUN_COUNT, &mut report),
        batch_size: decode(&mut raw, keys::BATCH_SIZE, &mut report),
    };
    let stored_digest: Option<String> = decode(&mut raw, keys::INPUTS_DIGEST, &mut report);

    if let Some(raw_sorted) = decode::<Vec<Vec<u64>>>(&mut raw, keys::SORTED_PROGRESSION, &mut report) {
        match SortedProgression::from_periods(raw_sorted) {
            Ok(sorted) => snapshot.sorted_progression = Some(sorted),
            Err(reason) => report.discard(keys::SORTED_PROGRESSION, reason),
        }
    }

    if snapshot.simulation_periods == Some(0) {
        report.discard(keys::SIMULATION_PERIODS, "period count must be positive");
        snapshot.simulation_periods = None;
    }
    for (key, value) in [
        (keys::RUN_COUNT, &mut snapshot.run_count),
        (keys::BATCH_SIZE, &mut snapshot.batch_size),
    ] {
        if *value == Some(0) {
            report.discard(key, "must be positive");
            *value = None;
        }
    }

    if let Some(progression) = &snapshot.progression {
        if let Err(reason) = progression.check_consistency() {
            report.discard(keys::PROGRESSION, reason);
            snapshot.progression = None;
        }
    }

    // The unsorted arrays and their sorted copy are restored together or not at all
    let paired = match (&snapshot.progression, &snapshot.sorted_progression) {
        (Some(progression), Some(sorted)) => same_shape(progression, sorted),
        (None, None) => true,
        _ => false,
    };
    let periods_agree = match (snapshot.simulation_periods, &snapshot.progression) {
        (Some(periods), Some(progression)) => progression.period_count() == periods,
        _ => true,
    };
    if !paired || !periods_agree {
        discard_derived(&mut snapshot, &mut report, "arrays disagree with stored inputs");
    }

    // A discarded input cannot be hashed back to the stored digest
    let inputs_intact = ![keys::MILESTONE, keys::SIMULATION_PERIODS, keys::HISTORICAL_DATA]
        .iter()
        .any(|key| report.was_discarded(key));
    let digest_mismatch = match (&stored_digest, &snapshot.historical_data) {
        (Some(stored), Some(data)) if inputs_intact => {
            *stored != compute_inputs_digest(snapshot.milestone, snapshot.simulation_periods, data)?
        }
        _ => false,
    };
    if digest_mismatch {
        report.discard(keys::INPUTS_DIGEST, "inputs digest does not match stored inputs");
        discard_derived(&mut snapshot, &mut report, "arrays belong to different inputs");
    }

    Ok((snapshot, report))
}

/// Same period count and same run count in every period
pub(crate) fn same_shape(progression: &ProgressionByPeriod, sorted: &SortedProgression) -> bool {
    progression.period_count() == sorted.period_count()
        && progression
            .periods()
            .iter()
            .zip(sorted.periods())
            .all(|(a, b)| a.len() == b.len())
}

/// Drop the fields derived from a generation run
fn discard_derived(snapshot: &mut EnsembleSnapshot, report: &mut LoadReport, reason: &str) {
    if snapshot.progression.take().is_some() {
        report.discard(keys::PROGRESSION, reason);
    }
    if snapshot.sorted_progression.take().is_some() {
        report.discard(keys::SORTED_PROGRESSION, reason);
    }
    if snapshot.generated_timestamp.take().is_some() {
        report.discard(keys::GENERATED_TIMESTAMP, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use std::cell::Cell;

    /// Counts adapter calls on top of a MemoryStore
    struct CountingStore {
        inner: MemoryStore,
        reads: Cell<usize>,
        bulk_reads: Cell<usize>,
    }

    impl PersistenceAdapter for CountingStore {
        fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            self.reads.set(self.reads.get() + 1);
            self.inner.read(key)
        }

        fn read_all(&self, keys: &[&str]) -> Result<BTreeMap<String, String>, PersistenceError> {
            self.bulk_reads.set(self.bulk_reads.get() + 1);
            self.inner.read_all(keys)
        }

        fn write(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
            self.inner.write(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
            self.inner.remove(key)
        }
    }

    fn paired_snapshot() -> EnsembleSnapshot {
        EnsembleSnapshot {
            milestone: Some(5),
            simulation_periods: Some(1),
            historical_data: Some(vec![1, 2]),
            progression: Some(ProgressionByPeriod::from_periods(vec![vec![1, 2]])),
            sorted_progression: Some(SortedProgression::from_periods(vec![vec![1, 2]]).unwrap()),
            generated_timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    #[test]
    fn test_inputs_digest_deterministic() {
        let first = compute_inputs_digest(Some(15), Some(3), &[0, 10]).unwrap();
        let second = compute_inputs_digest(Some(15), Some(3), &[0, 10]).unwrap();
        assert_eq!(first, second, "Same inputs should produce same digest");
    }

    #[test]
    fn test_inputs_digest_differs_for_different_inputs() {
        let first = compute_inputs_digest(Some(15), Some(3), &[0, 10]).unwrap();
        let second = compute_inputs_digest(Some(15), Some(3), &[0, 11]).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_absent_fields_remove_keys() {
        let mut store = MemoryStore::new();
        store.write(keys::GENERATED_TIMESTAMP, "\"stale\"".to_string()).unwrap();

        write_snapshot(&mut store, &EnsembleSnapshot::default()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let store = MemoryStore::new();
        let (snapshot, report) = read_snapshot(&store).unwrap();
        assert_eq!(snapshot, EnsembleSnapshot::default());
        assert!(report.is_clean());
    }

    #[test]
    fn test_malformed_field_discarded_alone() {
        let mut store = MemoryStore::new();
        store.write(keys::MILESTONE, "\"fifteen\"".to_string()).unwrap();
        store.write(keys::SIMULATION_PERIODS, "3".to_string()).unwrap();

        let (snapshot, report) = read_snapshot(&store).unwrap();
        assert_eq!(snapshot.milestone, None);
        assert_eq!(snapshot.simulation_periods, Some(3));
        assert!(report.was_discarded(keys::MILESTONE));
    }

    #[test]
    fn test_unsorted_snapshot_discarded() {
        let mut store = MemoryStore::new();
        store.write(keys::SORTED_PROGRESSION, "[[3,1]]".to_string()).unwrap();

        let (snapshot, report) = read_snapshot(&store).unwrap();
        assert_eq!(snapshot.sorted_progression, None);
        assert!(report.was_discarded(keys::SORTED_PROGRESSION));
    }

    #[test]
    fn test_digest_mismatch_discards_derived_fields() {
        let mut store = MemoryStore::new();
        write_snapshot(&mut store, &paired_snapshot()).unwrap();
        store.write(keys::HISTORICAL_DATA, "[7,8]".to_string()).unwrap();

        let (loaded, report) = read_snapshot(&store).unwrap();
        assert_eq!(loaded.historical_data, Some(vec![7, 8]));
        assert_eq!(loaded.progression, None);
        assert_eq!(loaded.sorted_progression, None);
        assert_eq!(loaded.generated_timestamp, None);
        assert!(report.was_discarded(keys::INPUTS_DIGEST));
    }

    #[test]
    fn test_load_reads_store_once() {
        let mut store = CountingStore {
            inner: MemoryStore::new(),
            reads: Cell::new(0),
            bulk_reads: Cell::new(0),
        };
        write_snapshot(&mut store, &paired_snapshot()).unwrap();

        let (snapshot, report) = read_snapshot(&store).unwrap();
        assert!(report.is_clean());
        assert_eq!(snapshot.milestone, Some(5));
        assert_eq!(store.bulk_reads.get(), 1);
        assert_eq!(store.reads.get(), 0);
    }

    #[test]
    fn test_discarded_input_skips_digest_check() {
        let mut store = MemoryStore::new();
        write_snapshot(&mut store, &paired_snapshot()).unwrap();
        store.write(keys::MILESTONE, "\"five\"".to_string()).unwrap();

        let (loaded, report) = read_snapshot(&store).unwrap();
        assert_eq!(report.discarded.len(), 1);
        assert!(report.was_discarded(keys::MILESTONE));
        assert!(loaded.progression.is_some());
        assert!(loaded.generated_timestamp.is_some());
    }

    #[test]
    fn test_unpaired_sorted_snapshot_discarded() {
        let mut store = MemoryStore::new();
        write_snapshot(&mut store, &paired_snapshot()).unwrap();
        store.remove(keys::PROGRESSION).unwrap();

        let (loaded, report) = read_snapshot(&store).unwrap();
        assert_eq!(loaded.sorted_progression, None);
        assert_eq!(loaded.generated_timestamp, None);
        assert!(report.was_discarded(keys::SORTED_PROGRESSION));
        assert!(report.was_discarded(keys::GENERATED_TIMESTAMP));
    }

    #[test]
    fn test_ragged_sorted_snapshot_discarded() {
        let mut store = MemoryStore::new();
        write_snapshot(&mut store, &paired_snapshot()).unwrap();
        store.write(keys::SORTED_PROGRESSION, "[[1]]".to_string()).unwrap();

        let (loaded, report) = read_snapshot(&store).unwrap();
        assert_eq!(loaded.progression, None);
        assert_eq!(loaded.sorted_progression, None);
        assert!(report.was_discarded(keys::PROGRESSION));
    }
}
