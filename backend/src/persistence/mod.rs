//! Persistence adapter contract
//!
//! Ensemble state is persisted as independent string values under fixed
//! keys (see [`keys`]). An adapter only stores and returns those strings; the
//! checkpoint layer decides how fields are encoded.
//!
//! Shipped adapters:
//! - [`MemoryStore`]: in-process map, used by default and in tests
//! - [`JsonFileStore`]: a single JSON object file on disk

use crate::error::PersistenceError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted keys
pub mod keys {
    pub const MILESTONE: &str = "milestone";
    pub const SIMULATION_PERIODS: &str = "simulationPeriods";
    pub const HISTORICAL_DATA: &str = "historicalData";
    pub const PROGRESSION: &str = "simulationProgressionByPeriod";
    pub const SORTED_PROGRESSION: &str = "sortedSimulationProgressionByPeriod";
    pub const GENERATED_TIMESTAMP: &str = "generatedTimestamp";
    pub const GENERATION_ID: &str = "generationId";
    pub const INPUTS_DIGEST: &str = "inputsDigest";
    pub const RUN_COUNT: &str = "simulationRunCount";
    pub const BATCH_SIZE: &str = "simulationBatchSize";

    /// Keys wiped together with the ensemble
    pub const ENSEMBLE_KEYS: [&str; 8] = [
        MILESTONE,
        SIMULATION_PERIODS,
        HISTORICAL_DATA,
        PROGRESSION,
        SORTED_PROGRESSION,
        GENERATED_TIMESTAMP,
        GENERATION_ID,
        INPUTS_DIGEST,
    ];

    /// Every persisted key
    pub const ALL_KEYS: [&str; 10] = [
        MILESTONE,
        SIMULATION_PERIODS,
        HISTORICAL_DATA,
        PROGRESSION,
        SORTED_PROGRESSION,
        GENERATED_TIMESTAMP,
        GENERATION_ID,
        INPUTS_DIGEST,
        RUN_COUNT,
        BATCH_SIZE,
    ];
}

/// Durable key/value storage for ensemble state
pub trait PersistenceAdapter: Send {
    /// Value stored under `key`, or `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn write(&mut self, key: &str, value: String) -> Result<(), PersistenceError>;

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;

    /// Values of every present key among `keys`
    fn read_all(&self, keys: &[&str]) -> Result<BTreeMap<String, String>, PersistenceError> {
        let mut values = BTreeMap::new();
        for key in keys {
            if let Some(value) = self.read(key)? {
                values.insert(key.to_string(), value);
            }
        }
        Ok(values)
    }

    /// Write `Some` values and remove keys whose value is `None`
    fn write_all(&mut self, entries: Vec<(&str, Option<String>)>) -> Result<(), PersistenceError> {
        for (key, value) in entries {
            match value {
                Some(value) => self.write(key, value)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

/// In-memory adapter
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl PersistenceAdapter for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Adapter backed by one JSON object file
///
/// Each key maps to its string value. The file is rewritten on every
/// `write_all` batch, via a temporary sibling and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(&self) -> Result<Map<String, Value>, PersistenceError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(PersistenceError::Io {
                    path: self.path.display().to_string(),
                    source: e,
                })
            }
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(PersistenceError::CorruptStore {
                path: self.path.display().to_string(),
            }),
        }
    }

    fn store_map(&self, map: Map<String, Value>) -> Result<(), PersistenceError> {
        let io_err = |source: std::io::Error| PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let text = serde_json::to_string_pretty(&Value::Object(map)).map_err(|e| {
            PersistenceError::Serialization {
                key: self.path.display().to_string(),
                source: e,
            }
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, text).map_err(io_err)?;
        fs::rename(&staging, &self.path).map_err(io_err)
    }
}

fn stored_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        // Hand-edited files may store raw JSON instead of strings
        other => other.to_string(),
    }
}

impl PersistenceAdapter for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let map = self.load_map()?;
        Ok(map.get(key).map(stored_text))
    }

    /// Parses the file once for all keys
    fn read_all(&self, keys: &[&str]) -> Result<BTreeMap<String, String>, PersistenceError> {
        let map = self.load_map()?;
        Ok(keys
            .iter()
            .filter_map(|key| map.get(*key).map(|value| (key.to_string(), stored_text(value))))
            .collect())
    }

    fn write(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.write_all(vec![(key, Some(value))])
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.write_all(vec![(key, None)])
    }

    fn write_all(&mut self, entries: Vec<(&str, Option<String>)>) -> Result<(), PersistenceError> {
        let mut map = self.load_map()?;
        for (key, value) in entries {
            match value {
                Some(value) => {
                    map.insert(key.to_string(), Value::String(value));
                }
                None => {
                    map.remove(key);
                }
            }
        }
        self.store_map(map)
    }
}
