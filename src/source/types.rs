//! Types at the raw sample boundary.
//!
//! Sensor faults are decided here, by the source, and travel as tagged values.
//! Nothing downstream compares readings against sentinel numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Address of one input: board address plus channel on that board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId {
    pub address: u8,
    pub channel: u8,
}

impl ChannelId {
    pub fn new(address: u8, channel: u8) -> Self {
        Self { address, channel }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.channel)
    }
}

/// Kind of acquisition board a channel lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    /// Thermocouple input board, reads degrees Celsius
    Thermocouple,
    /// Analog voltage input board, reads volts
    Voltage,
}

/// Thermocouple junction type programmed into a thermocouple channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermocoupleType {
    J,
    K,
    T,
    E,
    R,
    S,
    B,
    N,
}

/// A fault condition reported by a thermocouple input instead of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFault {
    /// Thermocouple not connected
    OpenCircuit,
    /// Reading outside the convertible range
    OverRange,
    /// Input outside the common-mode range
    CommonMode,
}

impl SensorFault {
    /// Label written to the log in place of a value.
    pub fn label(self) -> &'static str {
        match self {
            SensorFault::OpenCircuit => "Open",
            SensorFault::OverRange => "OverRange",
            SensorFault::CommonMode => "Common Mode",
        }
    }
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One sample from a channel: a value, or the fault the sensor reported.
pub type Reading = Result<f64, SensorFault>;

/// Failures of the sample source itself. These abort acquisition.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("board {address} channel {channel} returned error code {code}")]
    Hardware { address: u8, channel: u8, code: i32 },

    #[error("sample source unavailable: {0}")]
    Unavailable(String),

    #[error("no more samples scripted for channel {0}")]
    Exhausted(ChannelId),
}

/// Capability to read the next sample from a board channel.
///
/// Implementations may block while the hardware converts a sample.
pub trait SampleSource: Send {
    /// Prepare a board for reading. Called once per board address at setup.
    fn open(&mut self, _address: u8) -> Result<(), SourceError> {
        Ok(())
    }

    /// Program the thermocouple type on a thermocouple channel.
    fn configure_thermocouple(
        &mut self,
        _channel: ChannelId,
        _tc_type: ThermocoupleType,
    ) -> Result<(), SourceError> {
        Ok(())
    }

    /// Read the next sample from `channel` on a board of the given kind.
    fn read_channel(&mut self, kind: BoardKind, channel: ChannelId)
        -> Result<Reading, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_labels() {
        assert_eq!(SensorFault::OpenCircuit.label(), "Open");
        assert_eq!(SensorFault::OverRange.label(), "OverRange");
        assert_eq!(SensorFault::CommonMode.to_string(), "Common Mode");
    }

    #[test]
    fn test_channel_id_ordering_and_display() {
        let a = ChannelId::new(2, 3);
        let b = ChannelId::new(3, 0);
        assert!(a < b);
        assert_eq!(a.to_string(), "2:3");
    }

    #[test]
    fn test_source_error_messages() {
        let err = SourceError::Hardware {
            address: 2,
            channel: 1,
            code: -3,
        };
        assert_eq!(err.to_string(), "board 2 channel 1 returned error code -3");
        let err = SourceError::Exhausted(ChannelId::new(0, 4));
        assert!(err.to_string().contains("0:4"));
    }
}
