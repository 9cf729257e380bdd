//! Per-cycle acquisition records.
//!
//! A [`CycleRecord`] holds everything one polling cycle produced: every
//! channel's reading (or fault) with its classification, the RPM estimate and
//! the pressure reading. Records carry the run they belong to so JSON-lines
//! logs from different runs can be merged.

use crate::core::classifier::Classification;
use crate::core::pressure::PressureReading;
use crate::source::types::{BoardKind, ChannelId, Reading, SensorFault};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The current record format version.
pub const RECORD_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "steadystate-daq";

/// A channel's value for one cycle, or the fault it reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingValue {
    Value(f64),
    Fault(SensorFault),
}

impl ReadingValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            ReadingValue::Value(v) => Some(*v),
            ReadingValue::Fault(_) => None,
        }
    }

    pub fn fault(&self) -> Option<SensorFault> {
        match self {
            ReadingValue::Value(_) => None,
            ReadingValue::Fault(fault) => Some(*fault),
        }
    }

    /// Two-decimal value, or the fault label.
    pub fn log_cell(&self) -> String {
        match self {
            ReadingValue::Value(v) => format!("{v:.2}"),
            ReadingValue::Fault(fault) => fault.label().to_string(),
        }
    }
}

impl From<Reading> for ReadingValue {
    fn from(reading: Reading) -> Self {
        match reading {
            Ok(v) => ReadingValue::Value(v),
            Err(fault) => ReadingValue::Fault(fault),
        }
    }
}

/// One channel's entry in a cycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelReading {
    pub channel: ChannelId,
    pub kind: BoardKind,
    pub value: ReadingValue,
    /// Present for channels that are classified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Window deviation after this cycle, once the window has filled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation: Option<f64>,
}

/// Everything produced by one polling cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub run_id: Uuid,
    /// Zero-based cycle number within the run
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub readings: Vec<ChannelReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<PressureReading>,
    /// Set instead of `pressure` when the pressure channel faulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure_fault: Option<SensorFault>,
}

impl CycleRecord {
    /// Readings of one board kind, in acquisition order.
    pub fn readings_of(&self, kind: BoardKind) -> impl Iterator<Item = &ChannelReading> {
        self.readings.iter().filter(move |r| r.kind == kind)
    }

    pub fn fault_count(&self) -> usize {
        self.readings
            .iter()
            .filter(|r| r.value.fault().is_some())
            .count()
    }

    /// Number of classified channels currently steady.
    pub fn steady_count(&self) -> usize {
        self.readings
            .iter()
            .filter(|r| r.classification == Some(Classification::Steady))
            .count()
    }

    /// Format this record as one CSV log line (without the newline).
    ///
    /// Columns: timestamp, every channel value (followed by its `Y`/`N` flag
    /// when classified), RPM, then pressure current and psi.
    pub fn to_csv_line(&self) -> String {
        let mut cells = vec![self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()];

        for reading in &self.readings {
            cells.push(reading.value.log_cell());
            if let Some(classification) = reading.classification {
                cells.push(classification.log_flag().to_string());
            }
        }
        if let Some(rpm) = self.rpm {
            cells.push(format!("{rpm:.0}"));
        }
        if let Some(pressure) = self.pressure {
            cells.push(format!("{:.7}", pressure.current_ma));
            cells.push(format!("{:.2}", pressure.psi));
        } else if let Some(fault) = self.pressure_fault {
            cells.push(fault.label().to_string());
            cells.push(fault.label().to_string());
        }

        cells.join(",")
    }
}

/// Metadata written once at the start of a run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHeader {
    pub producer: String,
    pub version: String,
    pub run_id: Uuid,
    pub host: String,
    pub started_at: DateTime<Utc>,
    /// CSV column names, in line order
    pub columns: Vec<String>,
}

/// Stamps cycle records with the run id and a sequence number.
pub struct RecordBuilder {
    run_id: Uuid,
    next_sequence: u64,
}

impl RecordBuilder {
    /// Create a builder for a new run with a unique run ID.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            next_sequence: 0,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Number of records built so far.
    pub fn built(&self) -> u64 {
        self.next_sequence
    }

    /// Build the header for this run.
    pub fn header(&self, columns: Vec<String>) -> RunHeader {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());

        RunHeader {
            producer: PRODUCER_NAME.to_string(),
            version: RECORD_VERSION.to_string(),
            run_id: self.run_id,
            host,
            started_at: Utc::now(),
            columns,
        }
    }

    /// Build the next cycle record.
    pub fn build(
        &mut self,
        readings: Vec<ChannelReading>,
        rpm: Option<f64>,
        pressure: Option<PressureReading>,
    ) -> CycleRecord {
        let record = CycleRecord {
            run_id: self.run_id,
            sequence: self.next_sequence,
            timestamp: Utc::now(),
            readings,
            rpm,
            pressure,
            pressure_fault: None,
        };
        self.next_sequence += 1;
        record
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}
