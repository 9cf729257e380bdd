//! 4-20 mA pressure transducer conversion.
//!
//! The transducer loop current is measured as a voltage across a shunt
//! resistor on a voltage board channel.

use serde::{Deserialize, Serialize};

/// Linear calibration of a current-loop pressure transducer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureCalibration {
    /// Shunt resistance in ohms
    pub shunt_ohms: f64,
    /// psi per milliamp
    pub slope_psi_per_ma: f64,
    /// psi at zero current
    pub offset_psi: f64,
}

impl Default for PressureCalibration {
    fn default() -> Self {
        Self {
            shunt_ohms: 240.63,
            slope_psi_per_ma: 12.5005,
            offset_psi: -49.9417,
        }
    }
}

/// A converted pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureReading {
    pub current_ma: f64,
    pub psi: f64,
}

impl PressureCalibration {
    /// Loop current in milliamps for a shunt voltage.
    pub fn current_ma(&self, volts: f64) -> f64 {
        volts / self.shunt_ohms * 1000.0
    }

    pub fn convert(&self, volts: f64) -> PressureReading {
        let current_ma = self.current_ma(volts);
        PressureReading {
            current_ma,
            psi: current_ma * self.slope_psi_per_ma + self.offset_psi,
        }
    }
}
