//! Record file rotation against a real directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use unostat::exporter::next_rotation_path;
use unostat::{CsvExporter, DiskStats, ExportSettings, NetStats, PipelineStats, Snapshot};

fn snapshot(offset_secs: i64, disks: &[&str]) -> Snapshot {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(offset_secs);
    let mut snapshot = Snapshot::new(ts);
    snapshot.cpu = 12.5;
    snapshot.cpu_wait = 1.0;
    snapshot.memory = 40.0;
    snapshot.disks = disks
        .iter()
        .map(|d| {
            (
                d.to_string(),
                DiskStats {
                    utilization: 3.0,
                    await_ms: 0.5,
                    iops: 10.0,
                },
            )
        })
        .collect::<BTreeMap<_, _>>();
    snapshot
        .networks
        .insert("eth0".to_string(), NetStats { bandwidth_bps: 1_000_000.0 });
    snapshot
}

fn exporter(path: &Path, rotate_bytes: u64, stats: &Arc<PipelineStats>) -> CsvExporter {
    let mut settings = ExportSettings::new(path);
    settings.rotate_bytes = rotate_bytes;
    settings.timezone = "UTC".to_string();
    CsvExporter::new(settings, Arc::clone(stats)).unwrap()
}

#[test]
fn test_rotation_skips_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("metrics.csv");
    let existing = dir.path().join("metrics_1.csv");
    fs::write(&existing, "keep me\n").unwrap();

    let stats = Arc::new(PipelineStats::new());
    let mut exporter = exporter(&base, 1, &stats);

    exporter.write_snapshot(&snapshot(0, &["sda"])).unwrap();
    exporter.write_snapshot(&snapshot(30, &["sda"])).unwrap();

    assert_eq!(exporter.current_path(), dir.path().join("metrics_2.csv"));
    exporter.close().unwrap();

    assert_eq!(fs::read_to_string(&existing).unwrap(), "keep me\n");
    assert_eq!(stats.rotations.load(Ordering::Relaxed), 1);

    let rotated = fs::read_to_string(dir.path().join("metrics_2.csv")).unwrap();
    let lines: Vec<&str> = rotated.lines().collect();
    assert_eq!(lines.len(), 2, "fresh header plus the row that triggered rotation");
    assert!(lines[0].starts_with("Timestamp,"));
    assert!(lines[1].starts_with("2024-03-01 12:00:30,"));
}

#[test]
fn test_rotated_file_uses_current_devices() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("host.csv");

    let stats = Arc::new(PipelineStats::new());
    let mut exporter = exporter(&base, 1, &stats);

    exporter.write_snapshot(&snapshot(0, &["sda"])).unwrap();
    exporter.write_snapshot(&snapshot(30, &["sda", "sdb"])).unwrap();
    exporter.close().unwrap();

    let first = fs::read_to_string(&base).unwrap();
    assert!(!first.lines().next().unwrap().contains("[sdb]"));

    let second = fs::read_to_string(dir.path().join("host_1.csv")).unwrap();
    let header = second.lines().next().unwrap();
    let row = second.lines().nth(1).unwrap();
    assert!(header.contains("Disk [sdb] Utilization (%)"));
    assert_eq!(header.split(',').count(), row.split(',').count());
}

#[test]
fn test_no_rotation_below_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("small.csv");

    let stats = Arc::new(PipelineStats::new());
    let mut exporter = exporter(&base, 1024 * 1024, &stats);
    for i in 0..5 {
        exporter.write_snapshot(&snapshot(i * 30, &["sda"])).unwrap();
    }
    assert_eq!(exporter.current_path(), base.as_path());
    exporter.close().unwrap();

    assert_eq!(fs::read_to_string(&base).unwrap().lines().count(), 6);
    assert!(!dir.path().join("small_1.csv").exists());
}

#[test]
fn test_next_rotation_path_counts_past_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("data.csv");
    fs::write(dir.path().join("data_1.csv"), "").unwrap();
    fs::write(dir.path().join("data_2.csv"), "").unwrap();

    let (path, index) = next_rotation_path(&base, 0);
    assert_eq!(path, dir.path().join("data_3.csv"));
    assert_eq!(index, 3);

    let (path, index) = next_rotation_path(&base, 5);
    assert_eq!(path, dir.path().join("data_6.csv"));
    assert_eq!(index, 6);
}

#[test]
fn test_oversized_existing_file_gets_no_header() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("prev.csv");
    fs::write(&base, "old,data\n").unwrap();

    let stats = Arc::new(PipelineStats::new());
    let mut exporter = exporter(&base, 4, &stats);
    exporter.write_snapshot(&snapshot(0, &["sda"])).unwrap();
    exporter.close().unwrap();

    assert_eq!(fs::read_to_string(&base).unwrap(), "old,data\n");
    let rotated = fs::read_to_string(dir.path().join("prev_1.csv")).unwrap();
    assert_eq!(rotated.lines().count(), 2);
    assert!(rotated.starts_with("Timestamp,"));
}
