//! Periodic live readout of the most recent sample.

use gse_core::tags::{self, Tag};
use gse_core::{Sample, SampleStore};
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const STOP_CHECK: Duration = Duration::from_millis(50);
const MIN_INTERVAL: Duration = Duration::from_millis(10);

fn push_reading(out: &mut String, tag: &Tag, value: f64, decimals: usize) {
    if !out.is_empty() {
        out.push_str(" | ");
    }
    let _ = write!(out, "{}: {:.*} {}", tag.label, decimals, value, tag.unit);
}

/// `Tank Pressure: 75.00 psi | ... | Thrust: 500.00 mN`. Mass flow appears
/// only when the sample carries it, with three decimals.
pub fn format_readout(sample: &Sample) -> String {
    let mut out = String::new();
    push_reading(&mut out, &tags::TANK_PRESSURE_PSI, sample.tank_pressure, 2);
    push_reading(
        &mut out,
        &tags::ACCUMULATOR_PRESSURE_PSI,
        sample.accumulator_pressure,
        2,
    );
    push_reading(
        &mut out,
        &tags::INLET_TEMPERATURE_C,
        sample.inlet_temperature,
        2,
    );
    if let Some(mass_flow) = sample.mass_flow {
        push_reading(&mut out, &tags::MASS_FLOW_GPS, mass_flow, 3);
    }
    push_reading(&mut out, &tags::THRUST_MN, sample.thrust, 2);
    out
}

/// Log the latest sample every `interval` while new samples keep arriving.
pub fn spawn(
    store: Arc<SampleStore>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("readout".to_string())
        .spawn(move || {
            let interval = interval.max(MIN_INTERVAL);
            let mut last_shown: Option<usize> = None;
            let mut next = Instant::now() + interval;
            while !stop.load(Ordering::Relaxed) {
                if Instant::now() < next {
                    thread::sleep(STOP_CHECK.min(interval));
                    continue;
                }
                next += interval;

                let len = store.len();
                if last_shown == Some(len) {
                    continue;
                }
                if let Some(sample) = store.latest() {
                    info!(t = sample.timestamp, samples = len, "{}", format_readout(&sample));
                    last_shown = Some(len);
                }
            }
            debug!("Readout stopped");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mass_flow: Option<f64>) -> Sample {
        Sample {
            timestamp: 1.0,
            tank_pressure: 75.0,
            accumulator_pressure: 74.994,
            inlet_temperature: 130.0,
            mass_flow,
            thrust: 500.0,
        }
    }

    #[test]
    fn voltage_readout_omits_mass_flow() {
        assert_eq!(
            format_readout(&sample(None)),
            "Tank Pressure: 75.00 psi | Accumulator Pressure: 74.99 psi | \
             Inlet Temperature: 130.00 °C | Thrust: 500.00 mN"
        );
    }

    #[test]
    fn physical_readout_shows_mass_flow_with_three_decimals() {
        let text = format_readout(&sample(Some(0.1234)));
        assert!(text.contains("| Mass Flow Rate: 0.123 g/s | Thrust: 500.00 mN"));
    }
}
