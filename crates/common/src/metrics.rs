use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::Result;
use crate::{Axis, Direction};

/// One commanded control tick.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TickRecord {
    pub axis: Axis,
    pub tick: u32,
    pub measured: f64,
    pub target: f64,
    pub difference: f64,
    pub control: f64,
    pub speed_percent: f64,
    pub drive_level: u8,
    pub direction: Direction,
}

/// Thread-safe tick recorder.
/// Clones share the same storage.
#[derive(Clone, Default)]
pub struct TelemetryRecorder {
    records: Arc<Mutex<Vec<TickRecord>>>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::with_capacity(256))),
        }
    }

    pub fn record(&self, record: TickRecord) {
        if let Ok(mut data) = self.records.lock() {
            data.push(record);
        }
    }

    pub fn records(&self) -> Vec<TickRecord> {
        self.records
            .lock()
            .map(|data| data.clone())
            .unwrap_or_default()
    }

    pub fn records_for(&self, axis: Axis) -> Vec<TickRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.axis == axis)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|data| data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut data) = self.records.lock() {
            data.clear();
        }
    }

    pub fn save_to_csv(&self, path: impl AsRef<Path>) -> Result<usize> {
        let records = self.records();
        let mut wtr = csv::Writer::from_path(path)?;
        for record in &records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(records.len())
    }
}
