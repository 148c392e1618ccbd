//! Generation event log
//!
//! Records every lifecycle transition of the ensemble generator so hosts and
//! tests can audit how a generation progressed:
//! - **GenerationStarted**: inputs captured, arrays created empty
//! - **BatchCompleted**: one batch of runs recorded
//! - **Finalized**: sorted snapshot built, timestamp set
//! - **Reset**: derived state wiped
//! - **StaleJobRejected**: a superseded job tried to continue
//!
//! # Example
//!
//! ```rust
//! use throughput_forecast_core_rs::models::{Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::Reset { epoch: 3 });
//! assert_eq!(log.events_of_type("Reset").len(), 1);
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generator lifecycle event.
///
/// Every event carries the epoch of the generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    GenerationStarted {
        epoch: u64,
        generation_id: Uuid,
        run_count: usize,
        batch_size: usize,
        simulation_periods: usize,
    },

    /// Runs `[start, end)` recorded
    BatchCompleted {
        epoch: u64,
        start: usize,
        end: usize,
        completed: usize,
        total: usize,
    },

    Finalized {
        epoch: u64,
        generated_at: DateTime<Utc>,
    },

    Reset {
        epoch: u64,
    },

    StaleJobRejected {
        epoch: u64,
        current_epoch: u64,
    },
}

impl Event {
    /// Epoch of the generation the event belongs to
    pub fn epoch(&self) -> u64 {
        match self {
            Event::GenerationStarted { epoch, .. } => *epoch,
            Event::BatchCompleted { epoch, .. } => *epoch,
            Event::Finalized { epoch, .. } => *epoch,
            Event::Reset { epoch } => *epoch,
            Event::StaleJobRejected { epoch, .. } => *epoch,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::GenerationStarted { .. } => "GenerationStarted",
            Event::BatchCompleted { .. } => "BatchCompleted",
            Event::Finalized { .. } => "Finalized",
            Event::Reset { .. } => "Reset",
            Event::StaleJobRejected { .. } => "StaleJobRejected",
        }
    }
}

/// Append-only list of generator events
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific epoch
    pub fn events_for_epoch(&self, epoch: u64) -> Vec<&Event> {
        self.events.iter().filter(|e| e.epoch() == epoch).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
