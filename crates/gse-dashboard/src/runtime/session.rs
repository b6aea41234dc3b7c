use crate::infra::journal::{JournalEventType, SessionJournal};
use gse_core::{AcquisitionStatus, SampleStore};
use gse_io::metrics::{EXPORTS_COMPLETED, EXPORTS_FAILED};
use gse_io::{ExportError, ExportReceipt, Exporter};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// State shared by the console, the shutdown path and the telemetry
/// threads for the lifetime of one dashboard session.
pub struct Session {
    store: Arc<SampleStore>,
    status: Arc<AcquisitionStatus>,
    exporter: Exporter,
    journal: Option<Arc<SessionJournal>>,
}

impl Session {
    pub fn new(
        store: Arc<SampleStore>,
        status: Arc<AcquisitionStatus>,
        exporter: Exporter,
        journal: Option<Arc<SessionJournal>>,
    ) -> Self {
        Self {
            store,
            status,
            exporter,
            journal,
        }
    }

    pub fn store(&self) -> &Arc<SampleStore> {
        &self.store
    }

    pub fn record(&self, event: JournalEventType, details: serde_json::Value) {
        if let Some(journal) = &self.journal {
            journal.record(event, details);
        }
    }

    /// Export the current snapshot. Acquisition keeps running meanwhile.
    pub fn export(&self) -> Result<ExportReceipt, ExportError> {
        let snapshot = self.store.snapshot();
        match self.exporter.export(&snapshot) {
            Ok(receipt) => {
                EXPORTS_COMPLETED.inc();
                info!(path = %receipt.path.display(), rows = receipt.rows, "Data saved");
                self.record(
                    JournalEventType::ExportCompleted,
                    json!({ "path": receipt.path, "rows": receipt.rows }),
                );
                Ok(receipt)
            }
            Err(err) => {
                EXPORTS_FAILED.inc();
                match &err {
                    ExportError::EmptySnapshot => warn!("No data to save"),
                    other => error!(
                        dir = %self.exporter.dir().display(),
                        error = %other,
                        "Export failed"
                    ),
                }
                self.record(
                    JournalEventType::ExportFailed,
                    json!({ "dir": self.exporter.dir(), "error": err.to_string() }),
                );
                Err(err)
            }
        }
    }

    pub fn log_status(&self) {
        let stats = self.status.stats();
        info!(
            state = self.status.state().as_str(),
            series_len = self.store.len(),
            frames_received = stats.frames_received,
            samples_appended = stats.samples_appended,
            decode_errors = stats.decode_errors,
            calibration_errors = stats.calibration_errors,
            "Acquisition status"
        );
    }
}
