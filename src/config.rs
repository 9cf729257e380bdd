//! Configuration for the DAQ monitor.

use crate::core::classifier::{DEFAULT_DEVIATION_THRESHOLD, DEFAULT_WINDOW_SIZE};
use crate::core::pressure::PressureCalibration;
use crate::core::rpm::{DEFAULT_EDGE_THRESHOLD, DEFAULT_RATE_SCALE_FACTOR};
use crate::source::types::{ChannelId, ThermocoupleType};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time between acquisition cycles
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,

    /// Steady/transient classifier settings
    pub classifier: ClassifierConfig,

    /// RPM sampling and edge counting
    pub rpm: RpmConfig,

    /// Thermocouple boards
    pub thermo: ThermoConfig,

    /// Analog voltage boards
    pub voltage: VoltageConfig,

    /// Optional 4-20 mA pressure transducer
    pub pressure: Option<PressureConfig>,

    /// Directory for run logs
    pub log_dir: PathBuf,

    /// Directory for run statistics
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("steadystate-daq");

        Self {
            poll_interval: Duration::from_secs(1),
            classifier: ClassifierConfig::default(),
            rpm: RpmConfig::default(),
            thermo: ThermoConfig::default(),
            voltage: VoltageConfig::default(),
            pressure: Some(PressureConfig::default()),
            log_dir: data_dir.join("logs"),
            data_dir,
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(?path, "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("steadystate-daq")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.log_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Reject settings the acquisition loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classifier.window_size == 0 {
            return Err(ConfigError::Invalid(
                "classifier.window_size must be at least 1".to_string(),
            ));
        }
        if !self.classifier.deviation_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "classifier.deviation_threshold must be finite".to_string(),
            ));
        }
        if self.rpm.enabled {
            if self.rpm.sample_count < 2 {
                return Err(ConfigError::Invalid(
                    "rpm.sample_count must be at least 2".to_string(),
                ));
            }
            if !self.rpm.edge_threshold.is_finite() || self.rpm.edge_threshold <= 0.0 {
                return Err(ConfigError::Invalid(
                    "rpm.edge_threshold must be positive".to_string(),
                ));
            }
            if !self.rpm.rate_scale_factor.is_finite() {
                return Err(ConfigError::Invalid(
                    "rpm.rate_scale_factor must be finite".to_string(),
                ));
            }
        }
        if self.thermo.board_range.is_empty() || self.thermo.channel_range.is_empty() {
            return Err(ConfigError::Invalid(
                "thermo boards and channels must not be empty".to_string(),
            ));
        }
        if let Some(pressure) = &self.pressure {
            let shunt = pressure.calibration.shunt_ohms;
            if !shunt.is_finite() || shunt <= 0.0 {
                return Err(ConfigError::Invalid(
                    "pressure.shunt_ohms must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Thermocouple channels in acquisition order (board-major).
    pub fn thermo_channels(&self) -> Vec<ChannelId> {
        self.thermo.board_range.channels(&self.thermo.channel_range)
    }

    /// Voltage channels logged every cycle, in acquisition order.
    pub fn voltage_channels(&self) -> Vec<ChannelId> {
        self.voltage.board_range.channels(&self.voltage.channel_range)
    }
}

/// Steady/transient classifier settings, shared by every channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Readings in each channel's rolling window
    pub window_size: usize,
    /// Population standard deviation below which a channel is steady
    pub deviation_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            deviation_threshold: DEFAULT_DEVIATION_THRESHOLD,
        }
    }
}

/// Tachometer sampling and rate conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpmConfig {
    pub enabled: bool,
    /// Voltage board address of the tachometer input
    pub address: u8,
    /// Channel of the tachometer input
    pub channel: u8,
    /// Samples kept in the rolling history
    pub sample_count: usize,
    /// Time between samples
    #[serde(with = "duration_ms")]
    pub sample_interval: Duration,
    /// Level a sample must reach to count as a rising edge
    pub edge_threshold: f64,
    /// Multiplier from edges in the history to RPM
    pub rate_scale_factor: f64,
}

impl Default for RpmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: 0,
            channel: 0,
            sample_count: 300,
            sample_interval: Duration::from_millis(20),
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            rate_scale_factor: DEFAULT_RATE_SCALE_FACTOR,
        }
    }
}

impl RpmConfig {
    pub fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.address, self.channel)
    }
}

/// Unit thermocouple readings are converted to before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius reading into this unit.
    pub fn convert_celsius(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 1.8 + 32.0,
        }
    }
}

/// An inclusive range of board addresses or channel numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub first: u8,
    pub last: u8,
}

impl Span {
    pub fn new(first: u8, last: u8) -> Self {
        Self { first, last }
    }

    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    pub fn iter(&self) -> RangeInclusive<u8> {
        self.first..=self.last
    }

    /// Every (board, channel) pair with `self` as boards, board-major.
    pub fn channels(&self, channels: &Span) -> Vec<ChannelId> {
        self.iter()
            .flat_map(|address| channels.iter().map(move |ch| ChannelId::new(address, ch)))
            .collect()
    }
}

/// Thermocouple board layout and handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermoConfig {
    pub board_range: Span,
    pub channel_range: Span,
    pub thermocouple_type: ThermocoupleType,
    pub unit: TemperatureUnit,
    /// Whether thermocouple channels get a steady/transient flag
    pub classify: bool,
}

impl Default for ThermoConfig {
    fn default() -> Self {
        Self {
            board_range: Span::new(2, 4),
            channel_range: Span::new(0, 3),
            thermocouple_type: ThermocoupleType::T,
            unit: TemperatureUnit::Fahrenheit,
            classify: true,
        }
    }
}

/// Voltage board layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageConfig {
    pub board_range: Span,
    pub channel_range: Span,
    /// Whether voltage channels get a steady/transient flag
    pub classify: bool,
}

impl Default for VoltageConfig {
    fn default() -> Self {
        Self {
            board_range: Span::new(0, 1),
            channel_range: Span::new(0, 7),
            classify: false,
        }
    }
}

/// Pressure transducer input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    pub address: u8,
    pub channel: u8,
    pub calibration: PressureCalibration,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            address: 1,
            channel: 7,
            calibration: PressureCalibration::default(),
        }
    }
}

impl PressureConfig {
    pub fn channel_id(&self) -> ChannelId {
        ChannelId::new(self.address, self.channel)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
