//! Linear voltage-to-physical calibration.
//!
//! A [`CalibrationProfile`] is plain configuration. It is validated once at
//! startup into a [`Calibration`]; only validated channels can normalize,
//! so a zero voltage span can never reach per-sample math.

use crate::tags::{self, Tag};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_VOLTAGE_MIN: f64 = 0.5;
pub const DEFAULT_VOLTAGE_MAX: f64 = 4.5;
pub const DEFAULT_PRESSURE_SCALE: f64 = 150.0;
pub const DEFAULT_TEMPERATURE_SCALE: f64 = 260.0;
pub const DEFAULT_THRUST_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationConfigError {
    #[error("{channel}: voltage range has zero span ({voltage} V)")]
    ZeroSpan { channel: &'static str, voltage: f64 },
    #[error("{channel}: calibration parameters must be finite")]
    NonFinite { channel: &'static str },
    #[error("{channel}: voltage range {voltage_min} V to {voltage_max} V is too wide to represent")]
    SpanOverflow {
        channel: &'static str,
        voltage_min: f64,
        voltage_max: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("{channel}: reading {value} does not map to a finite value")]
    NonFiniteReading { channel: &'static str, value: f64 },
}

/// Per-channel linear scale, as configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub scale: f64,
    #[serde(default = "default_voltage_min")]
    pub voltage_min: f64,
    #[serde(default = "default_voltage_max")]
    pub voltage_max: f64,
}

fn default_voltage_min() -> f64 {
    DEFAULT_VOLTAGE_MIN
}

fn default_voltage_max() -> f64 {
    DEFAULT_VOLTAGE_MAX
}

impl CalibrationConfig {
    pub const fn new(scale: f64, voltage_min: f64, voltage_max: f64) -> Self {
        Self {
            scale,
            voltage_min,
            voltage_max,
        }
    }

    pub const fn with_default_range(scale: f64) -> Self {
        Self::new(scale, DEFAULT_VOLTAGE_MIN, DEFAULT_VOLTAGE_MAX)
    }

    pub fn validate(self, channel: &Tag) -> Result<ChannelCalibration, CalibrationConfigError> {
        if !self.scale.is_finite() || !self.voltage_min.is_finite() || !self.voltage_max.is_finite()
        {
            return Err(CalibrationConfigError::NonFinite {
                channel: channel.label,
            });
        }
        let span = self.voltage_max - self.voltage_min;
        if span == 0.0 {
            return Err(CalibrationConfigError::ZeroSpan {
                channel: channel.label,
                voltage: self.voltage_min,
            });
        }
        if !span.is_finite() {
            return Err(CalibrationConfigError::SpanOverflow {
                channel: channel.label,
                voltage_min: self.voltage_min,
                voltage_max: self.voltage_max,
            });
        }
        Ok(ChannelCalibration {
            channel: channel.label,
            scale: self.scale,
            voltage_min: self.voltage_min,
            span,
        })
    }
}

/// A channel calibration whose voltage span is known to be non-zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCalibration {
    channel: &'static str,
    scale: f64,
    voltage_min: f64,
    span: f64,
}

impl ChannelCalibration {
    pub fn channel(&self) -> &'static str {
        self.channel
    }

    pub fn normalize(&self, raw_value: f64) -> f64 {
        (raw_value - self.voltage_min) / self.span * self.scale
    }

    fn apply(&self, raw_value: f64) -> Result<f64, CalibrationError> {
        let value = self.normalize(raw_value);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CalibrationError::NonFiniteReading {
                channel: self.channel,
                value: raw_value,
            })
        }
    }
}

/// `(raw_value - voltage_min) / (voltage_max - voltage_min) * scale`.
pub fn normalize(raw_value: f64, cfg: &ChannelCalibration) -> f64 {
    cfg.normalize(raw_value)
}

/// Calibration file contents: one entry per voltage channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    pub tank_pressure: CalibrationConfig,
    pub accumulator_pressure: CalibrationConfig,
    pub inlet_temperature: CalibrationConfig,
    pub thrust: CalibrationConfig,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            tank_pressure: CalibrationConfig::with_default_range(DEFAULT_PRESSURE_SCALE),
            accumulator_pressure: CalibrationConfig::with_default_range(DEFAULT_PRESSURE_SCALE),
            inlet_temperature: CalibrationConfig::with_default_range(DEFAULT_TEMPERATURE_SCALE),
            thrust: CalibrationConfig::with_default_range(DEFAULT_THRUST_SCALE),
        }
    }
}

impl CalibrationProfile {
    pub fn validate(&self) -> Result<Calibration, CalibrationConfigError> {
        Ok(Calibration {
            tank_pressure: self.tank_pressure.validate(&tags::TANK_PRESSURE_PSI)?,
            accumulator_pressure: self
                .accumulator_pressure
                .validate(&tags::ACCUMULATOR_PRESSURE_PSI)?,
            inlet_temperature: self
                .inlet_temperature
                .validate(&tags::INLET_TEMPERATURE_C)?,
            thrust: self.thrust.validate(&tags::THRUST_MN)?,
        })
    }
}

/// Validated, immutable calibration for the four voltage channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub tank_pressure: ChannelCalibration,
    pub accumulator_pressure: ChannelCalibration,
    pub inlet_temperature: ChannelCalibration,
    pub thrust: ChannelCalibration,
}

impl Calibration {
    /// Normalize `(tank, accumulator, temperature, thrust)` voltages.
    pub fn apply(&self, volts: [f64; 4]) -> Result<[f64; 4], CalibrationError> {
        Ok([
            self.tank_pressure.apply(volts[0])?,
            self.accumulator_pressure.apply(volts[1])?,
            self.inlet_temperature.apply(volts[2])?,
            self.thrust.apply(volts[3])?,
        ])
    }
}
