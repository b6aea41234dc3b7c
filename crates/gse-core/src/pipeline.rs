//! Frame → Sample conversion for a fixed protocol mode.

use crate::calibration::{Calibration, CalibrationError};
use crate::frame::{self, DecodeError, RawFrame};
use crate::sample::Sample;
use crate::tags::{self, Tag};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Wire protocol variant. Fixed per deployment, never detected per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolMode {
    /// `tank_v,accumulator_v,temp_v,thrust_v`, calibrated.
    #[default]
    Voltage,
    /// `tank,accumulator,inlet_temp,mass_flow,thrust`, already physical.
    Physical,
}

impl ProtocolMode {
    pub const fn arity(self) -> usize {
        match self {
            Self::Voltage => 4,
            Self::Physical => 5,
        }
    }

    pub const fn columns(self) -> &'static [Tag] {
        match self {
            Self::Voltage => tags::VOLTAGE_COLUMNS,
            Self::Physical => tags::PHYSICAL_COLUMNS,
        }
    }

    pub const fn has_mass_flow(self) -> bool {
        matches!(self, Self::Physical)
    }
}

impl fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Voltage => f.write_str("voltage"),
            Self::Physical => f.write_str("physical"),
        }
    }
}

impl FromStr for ProtocolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "voltage" | "v3" => Ok(Self::Voltage),
            "physical" | "v2" => Ok(Self::Physical),
            other => Err(format!("unknown protocol '{other}' (expected voltage|physical)")),
        }
    }
}

/// Normalization stage, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Fields are already physical; identity transform.
    Passthrough,
    /// Fields are voltages mapped through a validated calibration.
    Voltage(Calibration),
}

impl Normalization {
    pub fn mode(&self) -> ProtocolMode {
        match self {
            Self::Passthrough => ProtocolMode::Physical,
            Self::Voltage(_) => ProtocolMode::Voltage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("calibration: {0}")]
    Calibration(#[from] CalibrationError),
}

#[derive(Debug, Clone, Copy)]
pub struct FramePipeline {
    normalization: Normalization,
}

impl FramePipeline {
    pub fn new(normalization: Normalization) -> Self {
        Self { normalization }
    }

    pub fn mode(&self) -> ProtocolMode {
        self.normalization.mode()
    }

    /// Decode and normalize one line. Nothing is produced unless every
    /// field of the line survives both stages.
    pub fn process(&self, line: &[u8], timestamp: f64) -> Result<Sample, FrameError> {
        let raw = frame::decode_bytes(line, self.mode().arity())?;
        self.to_sample(&raw, timestamp)
    }

    pub fn to_sample(&self, raw: &RawFrame, timestamp: f64) -> Result<Sample, FrameError> {
        let expected = self.mode().arity();
        if raw.arity() != expected {
            return Err(DecodeError::ArityMismatch {
                expected,
                found: raw.arity(),
            }
            .into());
        }
        let f = raw.fields();
        match &self.normalization {
            Normalization::Passthrough => {
                let channels = [
                    (&tags::TANK_PRESSURE_PSI, f[0]),
                    (&tags::ACCUMULATOR_PRESSURE_PSI, f[1]),
                    (&tags::INLET_TEMPERATURE_C, f[2]),
                    (&tags::MASS_FLOW_GPS, f[3]),
                    (&tags::THRUST_MN, f[4]),
                ];
                for (tag, value) in channels {
                    if !value.is_finite() {
                        return Err(CalibrationError::NonFiniteReading {
                            channel: tag.label,
                            value,
                        }
                        .into());
                    }
                }
                Ok(Sample {
                    timestamp,
                    tank_pressure: f[0],
                    accumulator_pressure: f[1],
                    inlet_temperature: f[2],
                    mass_flow: Some(f[3]),
                    thrust: f[4],
                })
            }
            Normalization::Voltage(cal) => {
                let [tank, accumulator, temperature, thrust] = cal.apply([f[0], f[1], f[2], f[3]])?;
                Ok(Sample {
                    timestamp,
                    tank_pressure: tank,
                    accumulator_pressure: accumulator,
                    inlet_temperature: temperature,
                    mass_flow: None,
                    thrust,
                })
            }
        }
    }
}
