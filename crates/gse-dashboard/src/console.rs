//! Operator console on stdin: export trigger, status, shutdown, and a
//! pass-through command channel to the controller.

use crate::infra::journal::JournalEventType;
use crate::runtime::Session;
use gse_io::metrics::COMMANDS_SENT;
use gse_io::CommandWriter;
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Save,
    Status,
    Quit,
    /// Anything else goes to the device verbatim.
    Device(String),
    Blank,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "" => Self::Blank,
            "save" => Self::Save,
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            _ => Self::Device(line.to_string()),
        }
    }
}

pub struct Console<W: Write> {
    session: Arc<Session>,
    commands: Option<CommandWriter<W>>,
    stop: Arc<AtomicBool>,
}

impl<W: Write> Console<W> {
    pub fn new(
        session: Arc<Session>,
        commands: Option<CommandWriter<W>>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            session,
            commands,
            stop,
        }
    }

    /// Returns `false` once the console should stop reading.
    pub fn handle(&mut self, command: ConsoleCommand) -> bool {
        match command {
            ConsoleCommand::Blank => {}
            ConsoleCommand::Save => {
                // Outcome is logged and journaled by the session.
                let _ = self.session.export();
            }
            ConsoleCommand::Status => self.session.log_status(),
            ConsoleCommand::Quit => {
                info!("Shutdown requested from console");
                self.stop.store(true, Ordering::Relaxed);
                return false;
            }
            ConsoleCommand::Device(text) => self.send(&text),
        }
        true
    }

    fn send(&mut self, text: &str) {
        let Some(writer) = self.commands.as_mut() else {
            warn!(command = text, "No device command channel; command dropped");
            return;
        };
        match writer.send(text) {
            Ok(()) => {
                COMMANDS_SENT.inc();
                info!(command = text, "Sent command");
                self.session.record(
                    JournalEventType::CommandSent,
                    json!({ "target": writer.target(), "command": text }),
                );
            }
            Err(err) => {
                error!(command = text, error = %err, "Failed to send command");
            }
        }
    }

    /// Process lines until `quit`, end of input, or a read error.
    pub fn run<R: BufRead>(&mut self, input: R) {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "Console input failed");
                    return;
                }
            };
            if !self.handle(ConsoleCommand::parse(&line)) {
                return;
            }
        }
        debug!("Console input closed; acquisition continues");
    }
}

impl<W: Write + Send + 'static> Console<W> {
    /// Read stdin on a background thread.
    pub fn spawn(mut self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("console".to_string())
            .spawn(move || self.run(io::stdin().lock()))
    }
}
