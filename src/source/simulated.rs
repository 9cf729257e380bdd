//! Synthetic sample source for running without acquisition hardware.
//!
//! Readings are a pure function of the time since the source was created:
//! thermocouples settle exponentially towards a per-channel setpoint, the
//! tachometer channel is a square wave, and the pressure channel carries a
//! constant loop current.

use crate::config::Config;
use crate::source::types::{
    BoardKind, ChannelId, Reading, SampleSource, SensorFault, SourceError, ThermocoupleType,
};
use std::collections::HashSet;
use std::f64::consts::TAU;
use std::time::Instant;

/// Shape of the synthetic signals.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Starting temperature of every thermocouple (°C)
    pub ambient_c: f64,
    /// Base temperature the thermocouples settle to (°C)
    pub setpoint_c: f64,
    /// Exponential settling time constant (seconds)
    pub settle_secs: f64,
    /// Voltage channel carrying the tachometer signal
    pub tach_channel: Option<ChannelId>,
    /// Tachometer pulse frequency (Hz)
    pub tach_hz: f64,
    /// High level of the tachometer pulse (volts)
    pub tach_high_volts: f64,
    /// Voltage channel measuring the pressure loop shunt
    pub pressure_channel: Option<ChannelId>,
    pub loop_current_ma: f64,
    pub shunt_ohms: f64,
    /// Thermocouple channels that report an open circuit
    pub open_channels: Vec<ChannelId>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            ambient_c: 21.0,
            setpoint_c: 60.0,
            settle_secs: 120.0,
            tach_channel: None,
            tach_hz: 5.0,
            tach_high_volts: 3.3,
            pressure_channel: None,
            loop_current_ma: 12.0,
            shunt_ohms: 240.63,
            open_channels: Vec::new(),
        }
    }
}

impl SimulatedConfig {
    /// Place the tachometer and pressure signals on the configured channels.
    pub fn from_config(config: &Config) -> Self {
        let mut sim = Self {
            tach_channel: Some(config.rpm.channel_id()),
            ..Self::default()
        };
        if let Some(pressure) = &config.pressure {
            sim.pressure_channel = Some(pressure.channel_id());
            sim.shunt_ohms = pressure.calibration.shunt_ohms;
        }
        sim
    }
}

/// A sample source producing deterministic synthetic signals.
pub struct SimulatedSource {
    config: SimulatedConfig,
    started: Instant,
    opened: HashSet<u8>,
}

impl SimulatedSource {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
            opened: HashSet::new(),
        }
    }

    /// The reading `channel` would produce `t` seconds after start.
    pub fn sample_at(&self, kind: BoardKind, channel: ChannelId, t: f64) -> Reading {
        let phase = channel.address as f64 + channel.channel as f64 * 0.25;
        match kind {
            BoardKind::Thermocouple => {
                if self.config.open_channels.contains(&channel) {
                    return Err(SensorFault::OpenCircuit);
                }
                let setpoint = self.config.setpoint_c + phase * 2.0;
                let settling = (setpoint - self.config.ambient_c)
                    * (-t / self.config.settle_secs).exp();
                let ripple = 0.02 * (TAU * t / 7.0 + phase).sin();
                Ok(setpoint - settling + ripple)
            }
            BoardKind::Voltage => {
                if Some(channel) == self.config.tach_channel {
                    let high = (t * self.config.tach_hz).fract() < 0.5;
                    Ok(if high { self.config.tach_high_volts } else { 0.0 })
                } else if Some(channel) == self.config.pressure_channel {
                    Ok(self.config.loop_current_ma / 1000.0 * self.config.shunt_ohms)
                } else {
                    Ok(1.0 + 0.5 * (TAU * t / 30.0 + phase).sin())
                }
            }
        }
    }
}

impl SampleSource for SimulatedSource {
    fn open(&mut self, address: u8) -> Result<(), SourceError> {
        self.opened.insert(address);
        Ok(())
    }

    fn configure_thermocouple(
        &mut self,
        channel: ChannelId,
        _tc_type: ThermocoupleType,
    ) -> Result<(), SourceError> {
        if !self.opened.contains(&channel.address) {
            return Err(SourceError::Unavailable(format!(
                "board {} is not open",
                channel.address
            )));
        }
        Ok(())
    }

    fn read_channel(
        &mut self,
        kind: BoardKind,
        channel: ChannelId,
    ) -> Result<Reading, SourceError> {
        if !self.opened.contains(&channel.address) {
            return Err(SourceError::Unavailable(format!(
                "board {} is not open",
                channel.address
            )));
        }
        let t = self.started.elapsed().as_secs_f64();
        Ok(self.sample_at(kind, channel, t))
    }
}
