use gse_core::{ProtocolMode, Sample, Snapshot};
use gse_io::{ExportError, Exporter};
use std::fs;
use tempfile::tempdir;

fn sample(t: f64, tank: f64, thrust: f64) -> Sample {
    Sample {
        timestamp: t,
        tank_pressure: tank,
        accumulator_pressure: tank - 5.0,
        inlet_temperature: 21.5,
        mass_flow: None,
        thrust,
    }
}

#[test]
fn three_sample_export_round_trips_through_csv() {
    let dir = tempdir().unwrap();
    let samples = vec![
        sample(0.1, 75.0, 500.0),
        sample(0.2, 74.5, 498.25),
        sample(0.35, 74.0, 497.0),
    ];
    let snapshot = Snapshot::from(samples.clone());

    let receipt = Exporter::new(dir.path(), ProtocolMode::Voltage)
        .export(&snapshot)
        .unwrap();
    assert_eq!(receipt.rows, 3);

    let name = receipt.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("dashboard_log_"));
    assert!(name.ends_with(".csv"));
    // dashboard_log_YYYYMMDD-HHMMSS.csv
    assert_eq!(name.len(), "dashboard_log_".len() + 15 + ".csv".len());

    let mut reader = csv::Reader::from_path(&receipt.path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec![
            "Time (s)",
            "Tank Pressure (psi)",
            "Accumulator Pressure (psi)",
            "Inlet Temperature (°C)",
            "Thrust (mN)",
        ]
    );

    let rows: Vec<Vec<f64>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(|f| f.parse().unwrap()).collect())
        .collect();
    let expected: Vec<Vec<f64>> = samples
        .iter()
        .map(|s| {
            vec![
                s.timestamp,
                s.tank_pressure,
                s.accumulator_pressure,
                s.inlet_temperature,
                s.thrust,
            ]
        })
        .collect();
    assert_eq!(rows, expected);

    // Only the final file is left in the directory.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    assert!(fs::read_to_string(&receipt.path).unwrap().ends_with('\n'));
}

#[test]
fn export_to_a_file_path_is_sink_unavailable() {
    let dir = tempdir().unwrap();
    let not_a_dir = dir.path().join("plain-file");
    fs::write(&not_a_dir, b"x").unwrap();

    let err = Exporter::new(&not_a_dir, ProtocolMode::Physical)
        .export(&Snapshot::from(vec![sample(0.0, 1.0, 2.0)]))
        .unwrap_err();
    assert!(matches!(err, ExportError::SinkUnavailable { .. }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
