//! Session journal: an append-only JSONL record of what happened during a
//! dashboard session (source problems, exports, commands sent).

use gse_core::TimeBase;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEventType {
    SessionStart,
    /// Source could not be opened; the dashboard runs without acquisition.
    SourceUnavailable,
    /// Calibration profile rejected at startup.
    CalibrationRejected,
    AcquisitionStarted,
    /// Acquisition ended, either on shutdown or because the source failed.
    AcquisitionStopped,
    ExportCompleted,
    ExportFailed,
    CommandSent,
    SessionEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonic session time in microseconds
    pub timestamp_us: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub event_type: JournalEventType,
    pub details: serde_json::Value,
}

/// Thread-safe JSONL writer, opened in append mode.
pub struct SessionJournal {
    writer: Mutex<BufWriter<File>>,
    timebase: TimeBase,
}

impl SessionJournal {
    pub fn new(path: &Path, timebase: TimeBase) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
            timebase,
        })
    }

    pub fn log(&self, entry: &JournalEntry) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Stamp and append an event. Failures are logged and otherwise ignored.
    pub fn record(&self, event_type: JournalEventType, details: serde_json::Value) {
        let entry = JournalEntry {
            timestamp_us: self.timebase.now_us(),
            unix_us: self.timebase.unix_us(),
            event_type,
            details,
        };
        if let Err(err) = self.log(&entry) {
            tracing::warn!(error = %err, event = ?event_type, "Failed to write journal entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn journal_appends_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs/session.jsonl");

        let journal = SessionJournal::new(&path, TimeBase::new()).unwrap();
        journal.record(JournalEventType::SessionStart, json!({"protocol": "voltage"}));
        journal.record(
            JournalEventType::ExportCompleted,
            json!({"path": "dashboard_log_20240309-140507.csv", "rows": 3}),
        );
        drop(journal);

        // Reopening appends rather than truncating.
        let journal = SessionJournal::new(&path, TimeBase::new()).unwrap();
        journal.record(JournalEventType::SessionEnd, json!({}));

        let content = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<JournalEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].event_type, JournalEventType::SessionStart);
        assert_eq!(entries[1].details["rows"], 3);
        assert_eq!(entries[2].event_type, JournalEventType::SessionEnd);
        assert!(content.contains("\"event_type\":\"export_completed\""));
    }
}
