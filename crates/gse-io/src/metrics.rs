//! Prometheus metrics for the acquisition pipeline.

use gse_core::tags;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Header, Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Metric definitions are static literals; a failed registration only means
// the metric is already registered.
fn counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("static metric definition");
    let _ = REGISTRY.register(Box::new(counter.clone()));
    counter
}

fn gauge(name: &str, help: &str) -> Gauge {
    let gauge = Gauge::new(name, help).expect("static metric definition");
    let _ = REGISTRY.register(Box::new(gauge.clone()));
    gauge
}

// ============================================================================
// Acquisition Metrics
// ============================================================================

pub static FRAMES_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "gse_frames_received_total",
        "Lines received from the telemetry source",
    )
});

pub static SAMPLES_APPENDED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "gse_samples_appended_total",
        "Calibrated samples appended to the series",
    )
});

pub static DECODE_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "gse_decode_errors_total",
        "Frames discarded for wrong arity or unparsable fields",
    )
});

pub static CALIBRATION_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "gse_calibration_errors_total",
        "Frames discarded because a reading did not map to a finite value",
    )
});

pub static SOURCE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "gse_source_failures_total",
        "Telemetry source failures (unavailable at start or I/O error while running)",
    )
});

/// Acquisition state (0=idle,1=running,2=stopped)
pub static ACQUISITION_STATE: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new(
        "gse_acquisition_state",
        "Acquisition state (0=idle,1=running,2=stopped)",
    )
    .expect("static metric definition");
    let _ = REGISTRY.register(Box::new(gauge.clone()));
    gauge
});

pub static SERIES_LENGTH: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new("gse_series_length", "Samples held in the series buffer")
        .expect("static metric definition");
    let _ = REGISTRY.register(Box::new(gauge.clone()));
    gauge
});

// ============================================================================
// Export / Command Metrics
// ============================================================================

pub static EXPORTS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter("gse_exports_completed_total", "CSV exports written")
});

pub static EXPORTS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "gse_exports_failed_total",
        "CSV exports that failed (empty series or unavailable target)",
    )
});

pub static COMMANDS_SENT: LazyLock<IntCounter> = LazyLock::new(|| {
    counter("gse_commands_sent_total", "Commands written to the device")
});

// ============================================================================
// Latest Readings
// ============================================================================

pub static TANK_PRESSURE_PSI: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(tags::TANK_PRESSURE_PSI.metric, "Latest tank pressure in psi")
});

pub static ACCUMULATOR_PRESSURE_PSI: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::ACCUMULATOR_PRESSURE_PSI.metric,
        "Latest accumulator pressure in psi",
    )
});

pub static INLET_TEMPERATURE_C: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::INLET_TEMPERATURE_C.metric,
        "Latest inlet temperature in Celsius",
    )
});

pub static MASS_FLOW_GPS: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(tags::MASS_FLOW_GPS.metric, "Latest mass flow rate in g/s")
});

pub static THRUST_MN: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::THRUST_MN.metric, "Latest thrust in mN"));

// ============================================================================
// Metrics HTTP Server
// ============================================================================

pub fn encode_metrics() -> Result<Vec<u8>, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            let response = match request.url() {
                "/metrics" => match encode_metrics() {
                    Ok(buffer) => {
                        let mut response = Response::from_data(buffer);
                        if let Ok(header) = Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/plain; version=0.0.4"[..],
                        ) {
                            response.add_header(header);
                        }
                        response
                    }
                    Err(e) => {
                        tracing::warn!("Failed to encode metrics: {}", e);
                        Response::from_string("Internal Server Error")
                            .with_status_code(500)
                    }
                },
                "/health" => Response::from_string("OK"),
                // Ready once at least one sample made it into the series
                "/ready" if SAMPLES_APPENDED.get() > 0 => Response::from_string("Ready"),
                "/ready" => Response::from_string("Not Ready").with_status_code(503),
                _ => Response::from_string("Not Found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = FRAMES_RECEIVED.get();
    let _ = SAMPLES_APPENDED.get();
    let _ = DECODE_ERRORS.get();
    let _ = CALIBRATION_ERRORS.get();
    let _ = SOURCE_FAILURES.get();
    let _ = ACQUISITION_STATE.get();
    let _ = SERIES_LENGTH.get();
    let _ = EXPORTS_COMPLETED.get();
    let _ = EXPORTS_FAILED.get();
    let _ = COMMANDS_SENT.get();
    let _ = TANK_PRESSURE_PSI.get();
    let _ = ACCUMULATOR_PRESSURE_PSI.get();
    let _ = INLET_TEMPERATURE_C.get();
    let _ = MASS_FLOW_GPS.get();
    let _ = THRUST_MN.get();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_metrics_are_exposed() {
        init_metrics();
        SERIES_LENGTH.set(3);
        let text = String::from_utf8(encode_metrics().unwrap()).unwrap();
        assert!(text.contains("gse_series_length 3"));
        assert!(text.contains(tags::THRUST_MN.metric));
        assert!(text.contains("gse_frames_received_total"));
    }
}
