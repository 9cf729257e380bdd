//! One polling cycle over every configured channel.
//!
//! The acquisition owns a classifier per classified channel and the RPM
//! sample history. Each [`Acquisition::poll`] reads every channel once, in
//! layout order, and returns the resulting [`CycleRecord`].
//!
//! Fault policy: a channel that reports a [`SensorFault`] is logged with the
//! fault label and its reading is *not* inserted into the deviation window.
//! The channel keeps reporting the classification it had before the fault.
//!
//! [`SensorFault`]: crate::source::SensorFault

use crate::config::{Config, TemperatureUnit};
use crate::core::classifier::ClassifierBank;
use crate::core::pressure::{PressureCalibration, PressureReading};
use crate::core::rpm::EdgeCountEstimator;
use crate::record::{ChannelReading, CycleRecord, ReadingValue, RecordBuilder, RunHeader};
use crate::source::types::{
    BoardKind, ChannelId, SampleSource, SensorFault, SourceError, ThermocoupleType,
};
use thiserror::Error;
use uuid::Uuid;

/// Errors that stop an acquisition run.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("log write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("RPM sampler stopped unexpectedly")]
    SamplerStopped,
}

/// A channel's place in the acquisition layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSlot {
    pub id: ChannelId,
    pub kind: BoardKind,
    /// Index into the classifier bank, for classified channels
    pub classifier: Option<usize>,
}

impl ChannelSlot {
    /// Column name in the CSV log, e.g. `T2.0` or `V0.3`.
    pub fn column_name(&self) -> String {
        let prefix = match self.kind {
            BoardKind::Thermocouple => 'T',
            BoardKind::Voltage => 'V',
        };
        format!("{}{}.{}", prefix, self.id.address, self.id.channel)
    }
}

/// Polling state for one run.
pub struct Acquisition {
    slots: Vec<ChannelSlot>,
    bank: ClassifierBank,
    unit: TemperatureUnit,
    tc_type: ThermocoupleType,
    rpm: Option<EdgeCountEstimator>,
    pressure: Option<(ChannelId, PressureCalibration)>,
    builder: RecordBuilder,
}

impl Acquisition {
    /// Build the channel layout and classifier bank from configuration.
    pub fn new(config: &Config) -> Self {
        let mut slots = Vec::new();
        let mut classified = 0;

        let mut add = |id: ChannelId, kind: BoardKind, classify: bool| {
            let classifier = classify.then(|| {
                classified += 1;
                classified - 1
            });
            slots.push(ChannelSlot {
                id,
                kind,
                classifier,
            });
        };

        for id in config.thermo_channels() {
            add(id, BoardKind::Thermocouple, config.thermo.classify);
        }
        for id in config.voltage_channels() {
            add(id, BoardKind::Voltage, config.voltage.classify);
        }

        let rpm = config.rpm.enabled.then(|| {
            EdgeCountEstimator::new(
                config.rpm.sample_count,
                config.rpm.edge_threshold,
                config.rpm.rate_scale_factor,
            )
        });

        Self {
            slots,
            bank: ClassifierBank::new(
                classified,
                config.classifier.window_size,
                config.classifier.deviation_threshold,
            ),
            unit: config.thermo.unit,
            tc_type: config.thermo.thermocouple_type,
            rpm,
            pressure: config
                .pressure
                .as_ref()
                .map(|p| (p.channel_id(), p.calibration)),
            builder: RecordBuilder::new(),
        }
    }

    /// Open every board in the layout and program thermocouple types.
    pub fn setup<S: SampleSource + ?Sized>(&self, source: &mut S) -> Result<(), AcquisitionError> {
        let mut addresses: Vec<u8> = self.slots.iter().map(|s| s.id.address).collect();
        if let Some((id, _)) = self.pressure {
            addresses.push(id.address);
        }
        addresses.sort_unstable();
        addresses.dedup();

        for address in addresses {
            source.open(address)?;
        }

        for slot in self.slots.iter().filter(|s| s.kind == BoardKind::Thermocouple) {
            source.configure_thermocouple(slot.id, self.tc_type)?;
        }

        tracing::info!(
            channels = self.slots.len(),
            classified = self.bank.len(),
            "acquisition boards ready"
        );
        Ok(())
    }

    /// Push one tachometer sample into the RPM history.
    pub fn ingest_rpm_sample(&mut self, value: f64) {
        if let Some(estimator) = self.rpm.as_mut() {
            estimator.ingest(value);
        }
    }

    /// Read every channel once and build this cycle's record.
    ///
    /// A source error aborts the cycle and is returned unchanged.
    pub fn poll<S: SampleSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<CycleRecord, AcquisitionError> {
        let mut readings = Vec::with_capacity(self.slots.len());

        for slot in &self.slots {
            let mut reading = source.read_channel(slot.kind, slot.id)?;
            if slot.kind == BoardKind::Thermocouple {
                reading = reading.map(|celsius| self.unit.convert_celsius(celsius));
            }

            let (classification, deviation) = match (reading, slot.classifier) {
                (Ok(value), Some(index)) => {
                    let classification = self.bank.ingest(index, value);
                    let deviation = self.bank.get(index).and_then(|c| c.deviation());
                    (Some(classification), deviation)
                }
                (Err(fault), Some(index)) => {
                    tracing::warn!(channel = %slot.id, %fault, "sensor fault, reading skipped");
                    let previous = self.bank.get(index);
                    (
                        previous.map(|c| c.classification()),
                        previous.and_then(|c| c.deviation()),
                    )
                }
                (Err(fault), None) => {
                    tracing::warn!(channel = %slot.id, %fault, "sensor fault");
                    (None, None)
                }
                (Ok(_), None) => (None, None),
            };

            readings.push(ChannelReading {
                channel: slot.id,
                kind: slot.kind,
                value: ReadingValue::from(reading),
                classification,
                deviation,
            });
        }

        let rpm = self.rpm.as_ref().map(EdgeCountEstimator::compute_rate);

        let (pressure, pressure_fault) = match self.pressure {
            Some((id, calibration)) => read_pressure(source, id, calibration)?,
            None => (None, None),
        };

        let mut record = self.builder.build(readings, rpm, pressure);
        record.pressure_fault = pressure_fault;
        Ok(record)
    }

    /// CSV column names matching [`CycleRecord::to_csv_line`].
    pub fn csv_columns(&self) -> Vec<String> {
        let mut columns = vec!["timestamp".to_string()];
        for slot in &self.slots {
            let name = slot.column_name();
            if slot.classifier.is_some() {
                columns.push(name.clone());
                columns.push(format!("{name}_steady"));
            } else {
                columns.push(name);
            }
        }
        if self.rpm.is_some() {
            columns.push("rpm".to_string());
        }
        if self.pressure.is_some() {
            columns.push("pressure_ma".to_string());
            columns.push("pressure_psi".to_string());
        }
        columns
    }

    /// Header for this run's log.
    pub fn header(&self) -> RunHeader {
        self.builder.header(self.csv_columns())
    }

    pub fn run_id(&self) -> Uuid {
        self.builder.run_id()
    }

    pub fn slots(&self) -> &[ChannelSlot] {
        &self.slots
    }

    pub fn classifiers(&self) -> &ClassifierBank {
        &self.bank
    }

    pub fn rpm_estimator(&self) -> Option<&EdgeCountEstimator> {
        self.rpm.as_ref()
    }
}

fn read_pressure<S: SampleSource + ?Sized>(
    source: &mut S,
    id: ChannelId,
    calibration: PressureCalibration,
) -> Result<(Option<PressureReading>, Option<SensorFault>), AcquisitionError> {
    match source.read_channel(BoardKind::Voltage, id)? {
        Ok(volts) => Ok((Some(calibration.convert(volts)), None)),
        Err(fault) => {
            tracing::warn!(channel = %id, %fault, "pressure channel fault");
            Ok((None, Some(fault)))
        }
    }
}
