use gse_core::{
    AcquisitionConfig, AcquisitionExit, AcquisitionLoop, AcquisitionState, CalibrationConfig,
    CalibrationProfile, FramePipeline, FrameSource, Normalization, SampleStore, SourceError,
    TimeBase, MIN_POLL_INTERVAL,
};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Replays canned lines, then fails like an unplugged device.
struct ScriptedSource {
    lines: VecDeque<Vec<u8>>,
    fail_when_empty: bool,
}

impl ScriptedSource {
    fn new(lines: &[&str], fail_when_empty: bool) -> Self {
        Self {
            lines: lines.iter().map(|l| l.as_bytes().to_vec()).collect(),
            fail_when_empty,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        match self.lines.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.fail_when_empty => Err(SourceError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn voltage_pipeline() -> FramePipeline {
    let profile = CalibrationProfile {
        tank_pressure: CalibrationConfig::new(150.0, 0.5, 4.5),
        accumulator_pressure: CalibrationConfig::new(150.0, 0.5, 4.5),
        inlet_temperature: CalibrationConfig::new(260.0, 0.5, 4.5),
        thrust: CalibrationConfig::new(1000.0, 0.5, 4.5),
    };
    FramePipeline::new(Normalization::Voltage(profile.validate().unwrap()))
}

fn fast_config() -> AcquisitionConfig {
    AcquisitionConfig {
        poll_interval: Duration::from_millis(5),
        ..Default::default()
    }
}

#[test]
fn calibrated_frame_reaches_the_store() {
    let store = Arc::new(SampleStore::new());
    let source = ScriptedSource::new(&["2.5,2.5,2.5,2.5"], true);
    let acq = AcquisitionLoop::new(
        source,
        voltage_pipeline(),
        Arc::clone(&store),
        fast_config(),
        TimeBase::new(),
    );
    let status = acq.status();
    assert_eq!(status.state(), AcquisitionState::Idle);

    let report = acq.run(&AtomicBool::new(false));

    let snap = store.snapshot();
    assert_eq!(snap.len(), 1);
    let sample = snap.iter().next().unwrap();
    assert_eq!(sample.tank_pressure, 75.0);
    assert_eq!(sample.accumulator_pressure, 75.0);
    assert_eq!(sample.inlet_temperature, 130.0);
    assert_eq!(sample.thrust, 500.0);
    assert!(sample.timestamp >= 0.0);

    assert!(matches!(report.exit, AcquisitionExit::SourceFailed(SourceError::Io(_))));
    assert_eq!(status.state(), AcquisitionState::Stopped);
}

#[test]
fn malformed_frames_are_skipped_without_stopping() {
    let store = Arc::new(SampleStore::new());
    let source = ScriptedSource::new(
        &[
            "1.0,1.0,1.0,1.0",
            "1.0,1.0,1.0",
            "garbage",
            "",
            "1.0,oops,1.0,1.0",
            "1.0,inf,1.0,1.0",
            "4.5,4.5,4.5,4.5",
        ],
        true,
    );
    let report = AcquisitionLoop::new(
        source,
        voltage_pipeline(),
        Arc::clone(&store),
        fast_config(),
        TimeBase::new(),
    )
    .run(&AtomicBool::new(false));

    assert_eq!(report.stats.frames_received, 7);
    assert_eq!(report.stats.samples_appended, 2);
    assert_eq!(report.stats.decode_errors, 4);
    assert_eq!(report.stats.calibration_errors, 1);

    let samples = store.snapshot().to_vec();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[1].thrust, 1000.0);
    assert!(samples[0].timestamp <= samples[1].timestamp);
}

#[test]
fn stop_flag_ends_idle_loop_within_a_poll_interval() {
    let store = Arc::new(SampleStore::new());
    let poll = Duration::from_millis(20);
    let acq = AcquisitionLoop::new(
        ScriptedSource::new(&[], false),
        voltage_pipeline(),
        Arc::clone(&store),
        AcquisitionConfig {
            poll_interval: poll,
            ..Default::default()
        },
        TimeBase::new(),
    );
    let status = acq.status();
    let stop = Arc::new(AtomicBool::new(false));
    let handle = acq.spawn(Arc::clone(&stop)).unwrap();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(status.state(), AcquisitionState::Running);

    let requested = Instant::now();
    stop.store(true, Ordering::Relaxed);
    let report = handle.join().unwrap();

    assert!(requested.elapsed() < poll * 5);
    assert!(matches!(report.exit, AcquisitionExit::Shutdown));
    assert_eq!(status.state(), AcquisitionState::Stopped);
    assert!(store.is_empty());
}

/// Never yields a frame; counts how often it was asked.
struct CountingIdleSource {
    polls: Arc<AtomicU64>,
}

impl FrameSource for CountingIdleSource {
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        self.polls.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    fn describe(&self) -> String {
        "idle".to_string()
    }
}

#[test]
fn zero_poll_interval_does_not_spin() {
    let polls = Arc::new(AtomicU64::new(0));
    let acq = AcquisitionLoop::new(
        CountingIdleSource {
            polls: Arc::clone(&polls),
        },
        voltage_pipeline(),
        Arc::new(SampleStore::new()),
        AcquisitionConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        },
        TimeBase::new(),
    );
    assert_eq!(acq.config().poll_interval, MIN_POLL_INTERVAL);

    let stop = Arc::new(AtomicBool::new(false));
    let handle = acq.spawn(Arc::clone(&stop)).unwrap();
    thread::sleep(Duration::from_millis(50));
    stop.store(true, Ordering::Relaxed);
    handle.join().unwrap();

    // At a 1 ms floor, 50 ms allows a few dozen polls, not millions.
    assert!(polls.load(Ordering::Relaxed) < 1_000);
}

#[test]
fn readers_see_consistent_prefixes_while_acquiring() {
    let lines: Vec<String> = (0..2000)
        .map(|i| format!("{0},{0},{0},{0},{0}", i))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let store = Arc::new(SampleStore::with_chunk_len(64));
    let acq = AcquisitionLoop::new(
        ScriptedSource::new(&refs, true),
        FramePipeline::new(Normalization::Passthrough),
        Arc::clone(&store),
        fast_config(),
        TimeBase::new(),
    );
    let handle = acq.spawn(Arc::new(AtomicBool::new(false))).unwrap();

    let reader_store = Arc::clone(&store);
    let reader = thread::spawn(move || {
        for _ in 0..100 {
            let snap = reader_store.snapshot();
            let mut prev_t = f64::MIN;
            for (i, s) in snap.iter().enumerate() {
                assert_eq!(s.thrust, i as f64);
                assert!(s.timestamp >= prev_t);
                prev_t = s.timestamp;
            }
        }
    });

    let report = handle.join().unwrap();
    reader.join().unwrap();
    assert_eq!(report.stats.samples_appended, 2000);
    assert_eq!(store.len(), 2000);
}
