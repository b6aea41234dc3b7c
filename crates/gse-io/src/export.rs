//! CSV export of a sample snapshot.
//!
//! Rows go to a hidden temporary file inside the target directory, which is
//! fsynced and then renamed into place. A failed export therefore leaves no
//! file behind, and a reader never sees a truncated log.

use chrono::{DateTime, Local};
use gse_core::{ProtocolMode, Snapshot};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

pub const FILE_PREFIX: &str = "dashboard_log_";
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: no samples recorded")]
    EmptySnapshot,
    #[error("export target {} unavailable: {reason}", path.display())]
    SinkUnavailable { path: PathBuf, reason: String },
    #[error("export I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub path: PathBuf,
    pub rows: usize,
}

/// `dashboard_log_<YYYYMMDD-HHMMSS>.csv`, with `-N` appended on collision.
pub fn log_file_name(when: &DateTime<Local>, attempt: u32) -> String {
    let stamp = when.format("%Y%m%d-%H%M%S");
    if attempt == 0 {
        format!("{FILE_PREFIX}{stamp}.csv")
    } else {
        format!("{FILE_PREFIX}{stamp}-{attempt}.csv")
    }
}

/// Write the header and one row per sample, in arrival order.
pub fn write_csv<W: Write>(
    out: W,
    snapshot: &Snapshot,
    mode: ProtocolMode,
) -> Result<usize, ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    wtr.write_record(mode.columns().iter().map(|tag| tag.header))?;

    for s in snapshot.iter() {
        if mode.has_mass_flow() {
            wtr.serialize((
                s.timestamp,
                s.tank_pressure,
                s.accumulator_pressure,
                s.inlet_temperature,
                s.mass_flow,
                s.thrust,
            ))?;
        } else {
            wtr.serialize((
                s.timestamp,
                s.tank_pressure,
                s.accumulator_pressure,
                s.inlet_temperature,
                s.thrust,
            ))?;
        }
    }
    wtr.flush()?;
    Ok(snapshot.len())
}

/// Exports snapshots into one directory. Concurrent calls are serialized.
#[derive(Debug)]
pub struct Exporter {
    dir: PathBuf,
    mode: ProtocolMode,
    lock: Mutex<()>,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, mode: ProtocolMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn export(&self, snapshot: &Snapshot) -> Result<ExportReceipt, ExportError> {
        self.export_at(snapshot, &Local::now())
    }

    pub fn export_at(
        &self,
        snapshot: &Snapshot,
        when: &DateTime<Local>,
    ) -> Result<ExportReceipt, ExportError> {
        self.commit(snapshot, when, |file, snapshot, mode| {
            write_csv(file, snapshot, mode)
        })
    }

    fn commit<F>(
        &self,
        snapshot: &Snapshot,
        when: &DateTime<Local>,
        write: F,
    ) -> Result<ExportReceipt, ExportError>
    where
        F: FnOnce(&mut fs::File, &Snapshot, ProtocolMode) -> Result<usize, ExportError>,
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if snapshot.is_empty() {
            return Err(ExportError::EmptySnapshot);
        }
        self.check_sink()?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".dashboard_log_")
            .suffix(".csv.tmp")
            .tempfile_in(&self.dir)
            .map_err(|err| self.unavailable(err.to_string()))?;
        debug!(tmp = %tmp.path().display(), rows = snapshot.len(), "Writing export");

        let rows = write(tmp.as_file_mut(), snapshot, self.mode)?;
        tmp.as_file().sync_all()?;

        let path = self.persist(tmp, when)?;
        info!(path = %path.display(), rows, "Export complete");
        Ok(ExportReceipt { path, rows })
    }

    fn persist(&self, mut tmp: NamedTempFile, when: &DateTime<Local>) -> Result<PathBuf, ExportError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(log_file_name(when, attempt));
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => tmp = err.file,
                Err(err) => return Err(err.error.into()),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no free export file name for this second",
        )
        .into())
    }

    fn check_sink(&self) -> Result<(), ExportError> {
        let meta = fs::metadata(&self.dir).map_err(|err| self.unavailable(err.to_string()))?;
        if !meta.is_dir() {
            return Err(self.unavailable("not a directory".to_string()));
        }
        if meta.permissions().readonly() {
            return Err(self.unavailable("read-only".to_string()));
        }
        Ok(())
    }

    fn unavailable(&self, reason: String) -> ExportError {
        ExportError::SinkUnavailable {
            path: self.dir.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gse_core::Sample;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn snapshot(n: usize, mass_flow: bool) -> Snapshot {
        (0..n)
            .map(|i| Sample {
                timestamp: i as f64 * 0.1,
                tank_pressure: 75.0 + i as f64,
                accumulator_pressure: 70.0,
                inlet_temperature: 130.0,
                mass_flow: mass_flow.then_some(0.125),
                thrust: 500.0,
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn file_name_follows_pattern() {
        assert_eq!(
            log_file_name(&fixed_time(), 0),
            "dashboard_log_20240309-140507.csv"
        );
        assert_eq!(
            log_file_name(&fixed_time(), 2),
            "dashboard_log_20240309-140507-2.csv"
        );
    }

    #[test]
    fn physical_schema_includes_mass_flow() {
        let mut out = Vec::new();
        write_csv(&mut out, &snapshot(1, true), ProtocolMode::Physical).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Time (s),Tank Pressure (psi),Accumulator Pressure (psi),Inlet Temperature (°C),Mass Flow Rate (g/s),Thrust (mN)")
        );
        let row: Vec<f64> = lines
            .next()
            .unwrap()
            .split(',')
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(row, vec![0.0, 75.0, 70.0, 130.0, 0.125, 500.0]);
    }

    #[test]
    fn empty_snapshot_is_rejected_before_touching_disk() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path(), ProtocolMode::Voltage);
        assert!(matches!(
            exporter.export(&Snapshot::default()),
            Err(ExportError::EmptySnapshot)
        ));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn missing_directory_is_sink_unavailable() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("usb"), ProtocolMode::Voltage);
        assert!(matches!(
            exporter.export(&snapshot(3, false)),
            Err(ExportError::SinkUnavailable { .. })
        ));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn failure_mid_write_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path(), ProtocolMode::Voltage);
        let res = exporter.commit(&snapshot(3, false), &fixed_time(), |file, snap, mode| {
            write_csv(&mut *file, snap, mode)?;
            file.write_all(b"12.0,75.")?;
            Err(io::Error::new(io::ErrorKind::Other, "media removed").into())
        });
        assert!(matches!(res, Err(ExportError::Io(_))));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn same_second_exports_get_distinct_names() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path(), ProtocolMode::Voltage);
        let first = exporter.export_at(&snapshot(2, false), &fixed_time()).unwrap();
        let second = exporter.export_at(&snapshot(2, false), &fixed_time()).unwrap();
        assert_ne!(first.path, second.path);
        assert_eq!(
            dir_entries(dir.path()),
            vec![
                "dashboard_log_20240309-140507-1.csv".to_string(),
                "dashboard_log_20240309-140507.csv".to_string(),
            ]
        );
    }

    #[test]
    fn concurrent_exports_do_not_interleave() {
        let dir = tempdir().unwrap();
        let exporter = Arc::new(Exporter::new(dir.path(), ProtocolMode::Voltage));
        let snap = snapshot(500, false);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let exporter = Arc::clone(&exporter);
                let snap = snap.clone();
                thread::spawn(move || exporter.export_at(&snap, &fixed_time()).unwrap())
            })
            .collect();

        for handle in handles {
            let receipt = handle.join().unwrap();
            let text = fs::read_to_string(&receipt.path).unwrap();
            assert_eq!(text.lines().count(), 501);
            assert_eq!(receipt.rows, 500);
        }
        assert_eq!(dir_entries(dir.path()).len(), 4);
    }
}
