use crate::pipeline::{FrameError, FramePipeline};
use crate::source::{FrameSource, SourceError};
use crate::store::SampleStore;
use crate::timebase::TimeBase;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Floor for the idle poll interval; a zero sleep would spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Clone, Debug)]
pub struct AcquisitionConfig {
    /// Sleep between polls when the source has nothing to offer.
    pub poll_interval: Duration,
    /// Per-line failures logged individually before switching to a
    /// periodic summary.
    pub error_log_burst: u64,
    /// After the burst, log every Nth failure.
    pub error_log_every: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            error_log_burst: 10,
            error_log_every: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AcquisitionState {
    Idle = 0,
    Running = 1,
    Stopped = 2,
}

impl AcquisitionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub frames_received: u64,
    pub samples_appended: u64,
    pub decode_errors: u64,
    pub calibration_errors: u64,
}

impl AcquisitionStats {
    pub fn rejected(&self) -> u64 {
        self.decode_errors + self.calibration_errors
    }
}

/// Acquisition state and counters, readable from any thread.
#[derive(Debug, Default)]
pub struct AcquisitionStatus {
    state: AtomicU8,
    frames_received: AtomicU64,
    samples_appended: AtomicU64,
    decode_errors: AtomicU64,
    calibration_errors: AtomicU64,
}

impl AcquisitionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AcquisitionState {
        AcquisitionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: AcquisitionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn stats(&self) -> AcquisitionStats {
        AcquisitionStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            samples_appended: self.samples_appended.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            calibration_errors: self.calibration_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub enum AcquisitionExit {
    /// Stop flag observed.
    Shutdown,
    /// The source failed mid-run; its handle has been released.
    SourceFailed(SourceError),
}

#[derive(Debug)]
pub struct AcquisitionReport {
    pub stats: AcquisitionStats,
    pub exit: AcquisitionExit,
}

/// Owns a frame source and feeds decoded samples into the store.
///
/// `run` consumes the loop: once stopped, the source handle is dropped and
/// a fresh loop with a fresh source is needed to acquire again.
pub struct AcquisitionLoop<S: FrameSource> {
    source: S,
    pipeline: FramePipeline,
    store: Arc<SampleStore>,
    status: Arc<AcquisitionStatus>,
    config: AcquisitionConfig,
    timebase: TimeBase,
}

impl<S: FrameSource> AcquisitionLoop<S> {
    pub fn new(
        source: S,
        pipeline: FramePipeline,
        store: Arc<SampleStore>,
        mut config: AcquisitionConfig,
        timebase: TimeBase,
    ) -> Self {
        config.poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);
        Self {
            source,
            pipeline,
            store,
            status: Arc::new(AcquisitionStatus::new()),
            config,
            timebase,
        }
    }

    pub fn status(&self) -> Arc<AcquisitionStatus> {
        Arc::clone(&self.status)
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn run(mut self, stop: &AtomicBool) -> AcquisitionReport {
        info!(
            "acquisition running on {} ({} protocol)",
            self.source.describe(),
            self.pipeline.mode()
        );
        self.status.set_state(AcquisitionState::Running);

        let exit = loop {
            if stop.load(Ordering::Relaxed) {
                break AcquisitionExit::Shutdown;
            }

            match self.source.poll_frame() {
                Ok(Some(line)) => self.handle_frame(&line),
                Ok(None) => thread::sleep(self.config.poll_interval),
                Err(err) => {
                    error!("acquisition source failed: {err}");
                    break AcquisitionExit::SourceFailed(err);
                }
            }
        };

        let source_name = self.source.describe();
        drop(self.source);
        self.status.set_state(AcquisitionState::Stopped);

        let stats = self.status.stats();
        info!(
            "acquisition stopped on {source_name}: {} samples, {} rejected frames",
            stats.samples_appended,
            stats.rejected()
        );
        AcquisitionReport { stats, exit }
    }

    fn handle_frame(&mut self, line: &[u8]) {
        self.status.frames_received.fetch_add(1, Ordering::Relaxed);
        let timestamp = self.timebase.now_s();

        match self.pipeline.process(line, timestamp) {
            Ok(sample) => {
                self.store.append(sample);
                self.status.samples_appended.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                let counter = match err {
                    FrameError::Decode(_) => &self.status.decode_errors,
                    FrameError::Calibration(_) => &self.status.calibration_errors,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                self.report_rejection(&err, line);
            }
        }
    }

    fn report_rejection(&self, err: &FrameError, line: &[u8]) {
        let rejected = self.status.stats().rejected();
        let burst = self.config.error_log_burst;
        let every = self.config.error_log_every.max(1);
        if rejected <= burst {
            warn!(
                "discarding frame {:?}: {err}",
                String::from_utf8_lossy(line)
            );
        } else if (rejected - burst) % every == 0 {
            warn!("{rejected} frames discarded so far, latest: {err}");
        }
    }
}

impl<S: FrameSource + 'static> AcquisitionLoop<S> {
    /// Run the loop on its own named thread.
    pub fn spawn(
        self,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<thread::JoinHandle<AcquisitionReport>> {
        thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || self.run(&stop))
    }
}
