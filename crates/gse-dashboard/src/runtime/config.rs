use gse_core::{CalibrationProfile, ProtocolMode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{flag} requires a value")]
    MissingValue { flag: String },
    #[error("invalid value for {flag}: {value:?}")]
    InvalidValue { flag: String, value: String },
    #[error("unknown option {0}")]
    UnknownFlag(String),
    #[error("cannot read calibration file {}: {source}", path.display())]
    CalibrationRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse calibration file {}: {source}", path.display())]
    CalibrationParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub list_ports: bool,
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub protocol: ProtocolMode,
    pub calibration_path: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub export_on_exit: bool,
    pub poll_interval: Duration,
    pub readout_interval: Duration,
    pub simulate: bool,
    pub simulate_rate_hz: f64,
    pub run_seconds: Option<u64>,
    pub json_logs: bool,
    pub metrics_addr: Option<String>,
    pub journal_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            list_ports: false,
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(1000),
            protocol: ProtocolMode::Voltage,
            calibration_path: None,
            export_dir: PathBuf::from("."),
            export_on_exit: false,
            poll_interval: Duration::from_millis(100),
            readout_interval: Duration::from_millis(1000),
            simulate: false,
            simulate_rate_hz: 10.0,
            run_seconds: None,
            json_logs: false,
            metrics_addr: None,
            journal_path: None,
        }
    }
}

fn value<'a>(args: &'a [String], i: usize) -> Result<&'a str, ConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue {
            flag: args[i].clone(),
        })
}

fn parsed<T: std::str::FromStr>(args: &[String], i: usize) -> Result<T, ConfigError> {
    let raw = value(args, i)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        flag: args[i].clone(),
        value: raw.to_string(),
    })
}

fn positive_millis(args: &[String], i: usize) -> Result<Duration, ConfigError> {
    match parsed::<u64>(args, i)? {
        0 => Err(ConfigError::InvalidValue {
            flag: args[i].clone(),
            value: "0".to_string(),
        }),
        ms => Ok(Duration::from_millis(ms)),
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--port" => {
                    cfg.port = value(args, i)?.to_string();
                    i += 1;
                }
                "--baud" => {
                    cfg.baud_rate = parsed(args, i)?;
                    i += 1;
                }
                "--read-timeout-ms" => {
                    cfg.read_timeout = Duration::from_millis(parsed(args, i)?);
                    i += 1;
                }
                "--protocol" => {
                    cfg.protocol = parsed(args, i)?;
                    i += 1;
                }
                "--calibration" => {
                    cfg.calibration_path = Some(PathBuf::from(value(args, i)?));
                    i += 1;
                }
                "--export-dir" => {
                    cfg.export_dir = PathBuf::from(value(args, i)?);
                    i += 1;
                }
                "--export-on-exit" => {
                    cfg.export_on_exit = true;
                }
                "--poll-ms" => {
                    cfg.poll_interval = positive_millis(args, i)?;
                    i += 1;
                }
                "--readout-ms" => {
                    cfg.readout_interval = Duration::from_millis(parsed(args, i)?);
                    i += 1;
                }
                "--simulate" => {
                    cfg.simulate = true;
                }
                "--simulate-rate" => {
                    cfg.simulate = true;
                    cfg.simulate_rate_hz = parsed(args, i)?;
                    i += 1;
                }
                "--run-seconds" => {
                    cfg.run_seconds = Some(parsed(args, i)?);
                    i += 1;
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--metrics-addr" => {
                    cfg.metrics_addr = Some(value(args, i)?.to_string());
                    i += 1;
                }
                "--journal" => {
                    cfg.journal_path = Some(PathBuf::from(value(args, i)?));
                    i += 1;
                }
                "--list-ports" => {
                    cfg.list_ports = true;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                other => return Err(ConfigError::UnknownFlag(other.to_string())),
            }
            i += 1;
        }
        Ok(cfg)
    }

    /// Calibration profile from `--calibration`, or the built-in defaults.
    pub fn calibration_profile(&self) -> Result<CalibrationProfile, ConfigError> {
        match &self.calibration_path {
            Some(path) => load_calibration(path),
            None => Ok(CalibrationProfile::default()),
        }
    }

    pub fn print_help() {
        println!(
            r#"gse-dashboard - Ground support telemetry acquisition and logging

USAGE:
    gse-dashboard [OPTIONS]

OPTIONS:
    --port <PATH>           Serial device of the sensor controller [default: /dev/ttyACM0]
    --baud <N>              Serial baud rate [default: 9600]
    --read-timeout-ms <N>   Low-level serial read timeout [default: 1000]
    --protocol <NAME>       Frame protocol: voltage (4 fields, calibrated) or
                            physical (5 fields incl. mass flow) [default: voltage]
    --calibration <PATH>    JSON calibration profile (voltage protocol only)
    --export-dir <PATH>     Directory CSV logs are saved to [default: .]
    --export-on-exit        Save a CSV log when the dashboard shuts down
    --poll-ms <N>           Idle poll interval of the acquisition loop [default: 100]
    --readout-ms <N>        Live readout interval [default: 1000]
    --simulate              Use a simulated controller instead of the serial port
    --simulate-rate <HZ>    Frame rate of the simulated controller [default: 10]
    --run-seconds <SECS>    Run for a fixed duration then exit
    --json-logs             Output logs in JSON format (for log aggregation)
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --journal <PATH>        Append session events to a JSONL file
    --list-ports            List serial ports and exit
    -h, --help              Print this help message

CONSOLE (stdin):
    save                    Export the recorded series to CSV
    status                  Print acquisition state and counters
    quit | exit             Shut down
    <anything else>         Sent to the controller as a command line

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,gse_core=trace)

EXAMPLES:
    # Voltage-protocol controller, logs saved to a USB stick
    gse-dashboard --port /dev/ttyACM0 --export-dir /media/usb

    # Legacy physical-unit firmware at 115200 baud
    gse-dashboard --port /dev/ttyUSB0 --baud 115200 --protocol physical

    # Ten second simulated run, exporting on exit
    gse-dashboard --simulate --run-seconds 10 --export-on-exit
"#
        );
    }
}

pub fn load_calibration(path: &Path) -> Result<CalibrationProfile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::CalibrationRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::CalibrationParse {
        path: path.to_path_buf(),
        source,
    })
}
