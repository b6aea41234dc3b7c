use gse_core::{AcquisitionStats, AcquisitionStatus, SampleStore};
use gse_io::metrics::{
    init_metrics, serve_metrics, ACCUMULATOR_PRESSURE_PSI, ACQUISITION_STATE, CALIBRATION_ERRORS,
    DECODE_ERRORS, FRAMES_RECEIVED, INLET_TEMPERATURE_C, MASS_FLOW_GPS, SAMPLES_APPENDED,
    SERIES_LENGTH, TANK_PRESSURE_PSI, THRUST_MN,
};
use prometheus::IntCounter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

const UPDATE_INTERVAL: Duration = Duration::from_millis(200);

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

fn advance(counter: &IntCounter, current: u64, last: &mut u64) {
    if current > *last {
        counter.inc_by(current - *last);
        *last = current;
    }
}

pub fn start_metrics_updater(
    store: Arc<SampleStore>,
    status: Arc<AcquisitionStatus>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last = AcquisitionStats::default();
        loop {
            let stats = status.stats();
            advance(&FRAMES_RECEIVED, stats.frames_received, &mut last.frames_received);
            advance(&SAMPLES_APPENDED, stats.samples_appended, &mut last.samples_appended);
            advance(&DECODE_ERRORS, stats.decode_errors, &mut last.decode_errors);
            advance(
                &CALIBRATION_ERRORS,
                stats.calibration_errors,
                &mut last.calibration_errors,
            );
            ACQUISITION_STATE.set(status.state() as i64);
            SERIES_LENGTH.set(store.len() as i64);

            if let Some(sample) = store.latest() {
                TANK_PRESSURE_PSI.set(sample.tank_pressure);
                ACCUMULATOR_PRESSURE_PSI.set(sample.accumulator_pressure);
                INLET_TEMPERATURE_C.set(sample.inlet_temperature);
                if let Some(mass_flow) = sample.mass_flow {
                    MASS_FLOW_GPS.set(mass_flow);
                }
                THRUST_MN.set(sample.thrust);
            }

            // Final pass after stop so the last counts are published.
            if stop.load(Ordering::Relaxed) {
                break;
            }
            thread::sleep(UPDATE_INTERVAL);
        }
    })
}
