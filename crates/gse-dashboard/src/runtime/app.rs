use crate::console::Console;
use crate::infra::journal::{JournalEventType, SessionJournal};
use crate::readout;
use crate::runtime::config::{ConfigError, RuntimeConfig};
use crate::runtime::logging::init_tracing;
use crate::runtime::session::Session;
use crate::runtime::telemetry;
use gse_core::{
    AcquisitionConfig, AcquisitionExit, AcquisitionLoop, AcquisitionReport, AcquisitionStats,
    AcquisitionStatus, CalibrationConfigError, FramePipeline, FrameSource, Normalization,
    ProtocolMode, SampleStore, SimulatedController, SourceError, TimeBase,
};
use gse_io::metrics::SOURCE_FAILURES;
use gse_io::{list_ports, CommandWriter, Exporter, SerialConfig, SerialSource};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid calibration: {0}")]
    Calibration(#[from] CalibrationConfigError),
}

enum DashboardSource {
    Serial(SerialSource),
    Simulated(SimulatedController),
}

impl FrameSource for DashboardSource {
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        match self {
            Self::Serial(s) => s.poll_frame(),
            Self::Simulated(s) => s.poll_frame(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Serial(s) => s.describe(),
            Self::Simulated(s) => s.describe(),
        }
    }
}

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("gse-dashboard: {err}\nTry 'gse-dashboard --help' for usage.");
            return ExitCode::from(2);
        }
    };
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }
    if config.list_ports {
        let ports = list_ports();
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{port}");
        }
        return ExitCode::SUCCESS;
    }
    run(config);
    ExitCode::SUCCESS
}

pub fn run(config: RuntimeConfig) {
    init_tracing(config.json_logs);

    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let timebase = TimeBase::new();
    let journal = init_journal(config.journal_path.as_ref(), timebase);
    let record = |event: JournalEventType, details: serde_json::Value| {
        if let Some(journal) = &journal {
            journal.record(event, details);
        }
    };

    record(
        JournalEventType::SessionStart,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "protocol": config.protocol,
            "source": source_label(&config),
            "export_dir": config.export_dir,
            "metrics_enabled": config.metrics_addr.is_some(),
        }),
    );

    let pipeline = match build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!(error = %err, "Calibration rejected; acquisition not started");
            record(
                JournalEventType::CalibrationRejected,
                json!({ "error": err.to_string() }),
            );
            record(JournalEventType::SessionEnd, json!({ "samples": 0 }));
            return;
        }
    };

    let store = Arc::new(SampleStore::new());
    let stop = Arc::new(AtomicBool::new(false));

    let (status, mut acquisition, commands) = match open_source(&config) {
        Ok((source, commands)) => {
            let source_name = source.describe();
            let acq = AcquisitionLoop::new(
                source,
                pipeline,
                Arc::clone(&store),
                AcquisitionConfig {
                    poll_interval: config.poll_interval,
                    ..Default::default()
                },
                timebase,
            );
            let status = acq.status();
            info!(
                source = %source_name,
                protocol = %config.protocol,
                poll_ms = config.poll_interval.as_millis() as u64,
                "Starting acquisition"
            );
            match acq.spawn(Arc::clone(&stop)) {
                Ok(handle) => {
                    record(
                        JournalEventType::AcquisitionStarted,
                        json!({ "source": source_name, "protocol": config.protocol }),
                    );
                    (status, Some(handle), commands)
                }
                Err(err) => {
                    error!(error = %err, "Failed to spawn acquisition thread");
                    (status, None, commands)
                }
            }
        }
        Err(err) => {
            SOURCE_FAILURES.inc();
            error!(error = %err, "Telemetry source unavailable; running without acquisition");
            record(
                JournalEventType::SourceUnavailable,
                json!({ "source": source_label(&config), "error": err.to_string() }),
            );
            (Arc::new(AcquisitionStatus::new()), None, None)
        }
    };

    let session = Arc::new(Session::new(
        Arc::clone(&store),
        Arc::clone(&status),
        Exporter::new(&config.export_dir, config.protocol),
        journal.clone(),
    ));

    let metrics_updater = telemetry::start_metrics_updater(
        Arc::clone(&store),
        Arc::clone(&status),
        Arc::clone(&stop),
    );
    let readout_handle =
        match readout::spawn(Arc::clone(&store), config.readout_interval, Arc::clone(&stop)) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(error = %err, "Failed to start live readout");
                None
            }
        };
    // Left detached: it is blocked on stdin until the process exits.
    if let Err(err) = Console::new(Arc::clone(&session), commands, Arc::clone(&stop)).spawn() {
        warn!(error = %err, "Failed to start console");
    }

    info!(
        export_dir = %config.export_dir.display(),
        "Dashboard running. Type 'save', 'status' or 'quit'."
    );

    let deadline = config.run_seconds.map(|seconds| {
        info!(seconds, "Running for limited duration");
        Instant::now() + Duration::from_secs(seconds)
    });
    let mut report = None;
    while !stop.load(Ordering::Relaxed) {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!("Run duration elapsed");
            break;
        }
        if acquisition.as_ref().is_some_and(JoinHandle::is_finished) {
            report = acquisition
                .take()
                .and_then(|handle| finish_acquisition(handle, &session));
        }
        thread::sleep(SHUTDOWN_POLL);
    }
    stop.store(true, Ordering::Relaxed);
    if let Some(handle) = acquisition.take() {
        report = finish_acquisition(handle, &session);
    }

    if config.export_on_exit {
        // Outcome is logged and journaled by the session.
        let _ = session.export();
    }

    let _ = metrics_updater.join();
    if let Some(handle) = readout_handle {
        let _ = handle.join();
    }

    let stats = report.map(|r| r.stats).unwrap_or_else(|| status.stats());
    info!(
        samples = store.len(),
        frames_received = stats.frames_received,
        rejected = stats.rejected(),
        "Session complete"
    );
    record(
        JournalEventType::SessionEnd,
        json!({ "samples": store.len(), "stats": stats_json(&stats) }),
    );
}

fn source_label(config: &RuntimeConfig) -> String {
    if config.simulate {
        "simulated".to_string()
    } else {
        config.port.clone()
    }
}

fn build_pipeline(config: &RuntimeConfig) -> Result<FramePipeline, StartupError> {
    let normalization = match config.protocol {
        ProtocolMode::Voltage => {
            let calibration = config.calibration_profile()?.validate()?;
            Normalization::Voltage(calibration)
        }
        ProtocolMode::Physical => {
            if config.calibration_path.is_some() {
                warn!("Physical protocol carries calibrated values; --calibration ignored");
            }
            Normalization::Passthrough
        }
    };
    Ok(FramePipeline::new(normalization))
}

fn open_source(
    config: &RuntimeConfig,
) -> Result<(DashboardSource, Option<CommandWriter>), SourceError> {
    if config.simulate {
        info!(rate_hz = config.simulate_rate_hz, "Using simulated controller");
        let sim = SimulatedController::new(config.protocol, config.simulate_rate_hz);
        return Ok((DashboardSource::Simulated(sim), None));
    }

    let serial = SerialConfig {
        port: config.port.clone(),
        baud_rate: config.baud_rate,
        read_timeout: config.read_timeout,
    };
    let (source, commands) = SerialSource::open(&serial)?;
    Ok((DashboardSource::Serial(source), Some(commands)))
}

fn finish_acquisition(
    handle: JoinHandle<AcquisitionReport>,
    session: &Session,
) -> Option<AcquisitionReport> {
    let report = match handle.join() {
        Ok(report) => report,
        Err(_) => {
            error!("Acquisition thread panicked");
            return None;
        }
    };

    let reason = match &report.exit {
        AcquisitionExit::Shutdown => "shutdown".to_string(),
        AcquisitionExit::SourceFailed(err) => {
            SOURCE_FAILURES.inc();
            error!(
                error = %err,
                samples = session.store().len(),
                "Acquisition stopped; recorded samples remain available for export"
            );
            err.to_string()
        }
    };
    session.record(
        JournalEventType::AcquisitionStopped,
        json!({ "reason": reason, "stats": stats_json(&report.stats) }),
    );
    Some(report)
}

fn stats_json(stats: &AcquisitionStats) -> serde_json::Value {
    json!({
        "frames_received": stats.frames_received,
        "samples_appended": stats.samples_appended,
        "decode_errors": stats.decode_errors,
        "calibration_errors": stats.calibration_errors,
    })
}

fn init_journal(path: Option<&PathBuf>, timebase: TimeBase) -> Option<Arc<SessionJournal>> {
    path.and_then(|path| match SessionJournal::new(path, timebase) {
        Ok(journal) => {
            info!(path = %path.display(), "Session journal enabled");
            Some(Arc::new(journal))
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to open session journal; continuing without it");
            None
        }
    })
}
