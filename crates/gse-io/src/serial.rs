//! Serial-port frame source and the outbound command channel.

use gse_core::{FrameSource, LineBuffer, SourceError};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// Names of the serial ports the OS currently reports.
pub fn list_ports() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}

pub struct SerialSource {
    port: Box<dyn SerialPort>,
    name: String,
    lines: LineBuffer,
}

impl SerialSource {
    /// Open the port and split off a writer for device commands.
    pub fn open(config: &SerialConfig) -> Result<(Self, CommandWriter), SourceError> {
        let unavailable = |err: serialport::Error| SourceError::Unavailable {
            port: config.port.clone(),
            reason: err.to_string(),
        };

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(unavailable)?;
        let writer = port.try_clone().map_err(unavailable)?;

        info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            read_timeout_ms = config.read_timeout.as_millis() as u64,
            "Serial port opened"
        );

        Ok((
            Self {
                port,
                name: config.port.clone(),
                lines: LineBuffer::new(),
            },
            CommandWriter::new(writer, config.port.clone()),
        ))
    }
}

impl FrameSource for SerialSource {
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        if let Some(line) = self.lines.next_line() {
            return Ok(Some(line));
        }

        let available = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if available == 0 {
            return Ok(None);
        }

        let mut chunk = vec![0u8; available.min(READ_CHUNK)];
        match self.port.read(&mut chunk) {
            Ok(n) => {
                self.lines.extend(&chunk[..n]);
                Ok(self.lines.next_line())
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                debug!(port = %self.name, error = %err, "Serial read returned no data");
                Ok(None)
            }
            Err(err) => Err(SourceError::Io(err)),
        }
    }

    fn describe(&self) -> String {
        format!("serial port {}", self.name)
    }
}

/// Writes newline-terminated text commands to the device. Responses are
/// not read here; they arrive (if at all) on the frame stream.
pub struct CommandWriter<W: Write = Box<dyn SerialPort>> {
    sink: W,
    target: String,
}

impl<W: Write> CommandWriter<W> {
    pub fn new(sink: W, target: String) -> Self {
        Self { sink, target }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn send(&mut self, command: &str) -> io::Result<()> {
        let command = command.trim_end_matches(['\r', '\n']);
        self.sink.write_all(command.as_bytes())?;
        self.sink.write_all(b"\n")?;
        self.sink.flush()?;
        debug!(target_port = %self.target, command, "Command sent");
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
