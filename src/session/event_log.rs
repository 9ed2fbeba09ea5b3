//! Append-only record of every event emitted in a session.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One emitted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic within a session, starting at 0.
    pub seq: u64,
    pub name: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

/// Shared handle to a session's event log. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from previously captured records.
    pub fn from_records(records: Vec<EventRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// Append an event and return its sequence number.
    pub fn record(&self, name: &str, payload: &Value) -> u64 {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let seq = records.last().map(|r| r.seq + 1).unwrap_or(0);
        records.push(EventRecord {
            seq,
            name: name.to_string(),
            payload: payload.clone(),
            timestamp: Utc::now(),
        });
        seq
    }

    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Event names in emission order.
    pub fn names(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.name == name)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
