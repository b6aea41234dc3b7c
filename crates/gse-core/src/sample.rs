use serde::Serialize;

/// One calibrated measurement point. Values are always physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Seconds since acquisition start, monotonic.
    pub timestamp: f64,
    pub tank_pressure: f64,
    pub accumulator_pressure: f64,
    pub inlet_temperature: f64,
    /// Only present on the physical-unit protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass_flow: Option<f64>,
    pub thrust: f64,
}
