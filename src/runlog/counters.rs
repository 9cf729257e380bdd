//! Run counters.
//!
//! Counts what the acquisition loop did: cycles, logged readings, sensor
//! faults by kind and tachometer samples. Counters persist across runs so
//! `steadystate status` can report cumulative totals.

use crate::record::CycleRecord;
use crate::source::types::SensorFault;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the current run, optionally backed by a file.
#[derive(Debug)]
pub struct RunLog {
    /// Number of polling cycles completed
    cycles_completed: AtomicU64,
    /// Number of channel readings written to the log
    readings_logged: AtomicU64,
    open_circuit_faults: AtomicU64,
    over_range_faults: AtomicU64,
    common_mode_faults: AtomicU64,
    /// Number of tachometer samples fed to the RPM history
    rpm_samples: AtomicU64,
    /// Number of cycles that reported an RPM estimate
    rpm_estimates: AtomicU64,
    run_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            readings_logged: AtomicU64::new(0),
            open_circuit_faults: AtomicU64::new(0),
            over_range_faults: AtomicU64::new(0),
            common_mode_faults: AtomicU64::new(0),
            rpm_samples: AtomicU64::new(0),
            rpm_estimates: AtomicU64::new(0),
            run_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a run log that continues the totals stored at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!(error = %e, "could not load previous run counters");
        }

        log
    }

    /// Count one completed cycle and everything in it.
    pub fn record_cycle(&self, record: &CycleRecord) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.readings_logged
            .fetch_add(record.readings.len() as u64, Ordering::Relaxed);

        let faults = record
            .readings
            .iter()
            .filter_map(|r| r.value.fault())
            .chain(record.pressure_fault);
        for fault in faults {
            self.fault_counter(fault).fetch_add(1, Ordering::Relaxed);
        }

        if record.rpm.is_some() {
            self.rpm_estimates.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_rpm_samples(&self, count: u64) {
        self.rpm_samples.fetch_add(count, Ordering::Relaxed);
    }

    fn fault_counter(&self, fault: SensorFault) -> &AtomicU64 {
        match fault {
            SensorFault::OpenCircuit => &self.open_circuit_faults,
            SensorFault::OverRange => &self.over_range_faults,
            SensorFault::CommonMode => &self.common_mode_faults,
        }
    }

    pub fn stats(&self) -> RunStats {
        RunStats {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            readings_logged: self.readings_logged.load(Ordering::Relaxed),
            open_circuit_faults: self.open_circuit_faults.load(Ordering::Relaxed),
            over_range_faults: self.over_range_faults.load(Ordering::Relaxed),
            common_mode_faults: self.common_mode_faults.load(Ordering::Relaxed),
            rpm_samples: self.rpm_samples.load(Ordering::Relaxed),
            rpm_estimates: self.rpm_estimates.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_secs: (Utc::now() - self.run_start).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary printed when a run ends.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Run Statistics:\n\
             - Cycles completed: {}\n\
             - Readings logged: {}\n\
             - Sensor faults: {} (open {}, over range {}, common mode {})\n\
             - Tachometer samples: {}\n\
             - RPM estimates: {}\n\
             - Run duration: {} seconds",
            stats.cycles_completed,
            stats.readings_logged,
            stats.total_faults(),
            stats.open_circuit_faults,
            stats.over_range_faults,
            stats.common_mode_faults,
            stats.rpm_samples,
            stats.rpm_estimates,
            stats.run_duration_secs
        )
    }

    /// Save counters to the persistence file, if any.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedCounters {
                cycles_completed: stats.cycles_completed,
                readings_logged: stats.readings_logged,
                open_circuit_faults: stats.open_circuit_faults,
                over_range_faults: stats.over_range_faults,
                common_mode_faults: stats.common_mode_faults,
                rpm_samples: stats.rpm_samples,
                rpm_estimates: stats.rpm_estimates,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let persisted = load_persisted(path)?;

                self.cycles_completed
                    .store(persisted.cycles_completed, Ordering::Relaxed);
                self.readings_logged
                    .store(persisted.readings_logged, Ordering::Relaxed);
                self.open_circuit_faults
                    .store(persisted.open_circuit_faults, Ordering::Relaxed);
                self.over_range_faults
                    .store(persisted.over_range_faults, Ordering::Relaxed);
                self.common_mode_faults
                    .store(persisted.common_mode_faults, Ordering::Relaxed);
                self.rpm_samples
                    .store(persisted.rpm_samples, Ordering::Relaxed);
                self.rpm_estimates
                    .store(persisted.rpm_estimates, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the run counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub cycles_completed: u64,
    pub readings_logged: u64,
    pub open_circuit_faults: u64,
    pub over_range_faults: u64,
    pub common_mode_faults: u64,
    pub rpm_samples: u64,
    pub rpm_estimates: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_secs: u64,
}

impl RunStats {
    pub fn total_faults(&self) -> u64 {
        self.open_circuit_faults + self.over_range_faults + self.common_mode_faults
    }
}

/// On-disk counter format.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedCounters {
    pub cycles_completed: u64,
    pub readings_logged: u64,
    pub open_circuit_faults: u64,
    pub over_range_faults: u64,
    pub common_mode_faults: u64,
    pub rpm_samples: u64,
    pub rpm_estimates: u64,
    pub last_updated: DateTime<Utc>,
}

/// Read a counter file written by [`RunLog::save`].
pub fn load_persisted(path: &std::path::Path) -> Result<PersistedCounters, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}
