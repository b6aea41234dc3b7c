use crate::pipeline::ProtocolMode;
use crate::source::{FrameSource, SourceError};
use std::time::{Duration, Instant};

/// Simulated test-stand controller emitting well-formed frames.
///
/// Models a blowdown: the tank drains into the accumulator, the inlet warms
/// while flow is high, and thrust follows accumulator pressure.
#[derive(Debug, Clone)]
pub struct SimulatedController {
    mode: ProtocolMode,
    period: Duration,
    next_emit: Instant,
    t: f64,

    tank_psi: f64,
    accumulator_psi: f64,
    inlet_c: f64,

    drain_rate: f64,
    fill_rate: f64,
    ambient_c: f64,
    heating: f64,
    thrust_per_psi: f64,
}

impl SimulatedController {
    pub fn new(mode: ProtocolMode, rate_hz: f64) -> Self {
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            10.0
        };
        Self {
            mode,
            period: Duration::from_secs_f64(1.0 / rate_hz),
            next_emit: Instant::now(),
            t: 0.0,
            tank_psi: 140.0,
            accumulator_psi: 20.0,
            inlet_c: 25.0,
            drain_rate: 0.05,
            fill_rate: 0.2,
            ambient_c: 25.0,
            heating: 0.4,
            thrust_per_psi: 6.0,
        }
    }

    fn step(&mut self, dt_s: f64) {
        self.t += dt_s;

        // Tank drains exponentially; accumulator chases tank pressure.
        self.tank_psi -= self.tank_psi * self.drain_rate * dt_s;
        self.accumulator_psi += (self.tank_psi - self.accumulator_psi) * self.fill_rate * dt_s;

        // Inlet heats with flow, relaxes toward ambient.
        let flow = self.mass_flow();
        self.inlet_c += (self.heating * flow - 0.05 * (self.inlet_c - self.ambient_c)) * dt_s;
    }

    fn mass_flow(&self) -> f64 {
        (self.tank_psi - self.accumulator_psi).max(0.0) * 0.01
    }

    fn thrust(&self) -> f64 {
        self.accumulator_psi * self.thrust_per_psi + 5.0 * (self.t * 7.0).sin()
    }

    fn render(&self) -> String {
        match self.mode {
            ProtocolMode::Physical => format!(
                "{:.2},{:.2},{:.2},{:.3},{:.2}",
                self.tank_psi,
                self.accumulator_psi,
                self.inlet_c,
                self.mass_flow(),
                self.thrust()
            ),
            ProtocolMode::Voltage => {
                let volts = |value: f64, scale: f64| (0.5 + value / scale * 4.0).clamp(0.0, 5.0);
                format!(
                    "{:.4},{:.4},{:.4},{:.4}",
                    volts(self.tank_psi, 150.0),
                    volts(self.accumulator_psi, 150.0),
                    volts(self.inlet_c, 260.0),
                    volts(self.thrust(), 1000.0)
                )
            }
        }
    }
}

impl FrameSource for SimulatedController {
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let now = Instant::now();
        if now < self.next_emit {
            return Ok(None);
        }
        self.step(self.period.as_secs_f64());
        self.next_emit += self.period;
        // Do not burst to catch up after a stall.
        if self.next_emit < now {
            self.next_emit = now + self.period;
        }
        Ok(Some(self.render().into_bytes()))
    }

    fn describe(&self) -> String {
        format!("simulated controller ({} protocol)", self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationProfile;
    use crate::pipeline::{FramePipeline, Normalization};

    #[test]
    fn emits_frames_the_pipeline_accepts() {
        for (mode, norm) in [
            (ProtocolMode::Physical, Normalization::Passthrough),
            (
                ProtocolMode::Voltage,
                Normalization::Voltage(CalibrationProfile::default().validate().unwrap()),
            ),
        ] {
            let mut sim = SimulatedController::new(mode, 1000.0);
            let pipeline = FramePipeline::new(norm);
            let line = sim.poll_frame().unwrap().expect("first frame is immediate");
            let sample = pipeline.process(&line, 0.0).unwrap();
            assert!(sample.tank_pressure > 100.0);
            assert_eq!(sample.mass_flow.is_some(), mode.has_mass_flow());
        }
    }

    #[test]
    fn respects_emit_period() {
        let mut sim = SimulatedController::new(ProtocolMode::Physical, 1.0);
        assert!(sim.poll_frame().unwrap().is_some());
        assert!(sim.poll_frame().unwrap().is_none());
    }
}
