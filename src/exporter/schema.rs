//! Column layout of a record file.
//!
//! The schema is derived once from the snapshot that opens a file and reused
//! for every row written to it, so columns stay stable when devices appear or
//! disappear later.

use super::timezone::OutputZone;
use crate::metrics::Snapshot;

/// Marker for values that are not available.
pub const NOT_AVAILABLE: &str = "N/A";

pub const TIMESTAMP_COLUMN: &str = "Timestamp";
pub const CPU_COLUMN: &str = "CPU Utilization (%)";
pub const CPU_WAIT_COLUMN: &str = "CPU IO Wait (%)";
pub const MEMORY_COLUMN: &str = "Memory Utilization (%)";

/// Frozen, sorted device and interface column sets for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    disks: Vec<String>,
    networks: Vec<String>,
}

impl ColumnSchema {
    /// Derives the schema from a snapshot. Names come out sorted because the
    /// snapshot maps are ordered.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            disks: snapshot.disks.keys().cloned().collect(),
            networks: snapshot.networks.keys().cloned().collect(),
        }
    }

    pub fn disks(&self) -> &[String] {
        &self.disks
    }

    pub fn networks(&self) -> &[String] {
        &self.networks
    }

    /// Number of columns, timestamp included.
    pub fn width(&self) -> usize {
        4 + self.disks.len() * 3 + self.networks.len()
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.width());
        header.push(TIMESTAMP_COLUMN.to_string());
        header.push(CPU_COLUMN.to_string());
        header.push(CPU_WAIT_COLUMN.to_string());
        header.push(MEMORY_COLUMN.to_string());

        for disk in &self.disks {
            header.push(format!("Disk [{}] Utilization (%)", disk));
            header.push(format!("Disk [{}] Average Wait (ms)", disk));
            header.push(format!("Disk [{}] Throughput (IOPS)", disk));
        }
        for iface in &self.networks {
            header.push(format!("Network [{}] Throughput (Mbps)", iface));
        }

        header
    }

    /// Renders one row. Devices in the schema but missing from the snapshot,
    /// and an unavailable CPU wait, render as `N/A`.
    pub fn row(&self, snapshot: &Snapshot, zone: &OutputZone) -> Vec<String> {
        let mut row = Vec::with_capacity(self.width());
        row.push(zone.format(snapshot.timestamp));
        row.push(format_value(snapshot.cpu));
        row.push(if snapshot.has_cpu_wait() {
            format_value(snapshot.cpu_wait)
        } else {
            NOT_AVAILABLE.to_string()
        });
        row.push(format_value(snapshot.memory));

        for disk in &self.disks {
            match snapshot.disks.get(disk) {
                Some(stats) => {
                    row.push(format_value(stats.utilization));
                    row.push(format_value(stats.await_ms));
                    row.push(format_value(stats.iops));
                }
                None => row.extend(std::iter::repeat(NOT_AVAILABLE.to_string()).take(3)),
            }
        }
        for iface in &self.networks {
            match snapshot.networks.get(iface) {
                Some(stats) => row.push(format_value(stats.mbps())),
                None => row.push(NOT_AVAILABLE.to_string()),
            }
        }

        row
    }
}

fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}

/// Approximate on-disk size of a record: each cell plus its separator, plus
/// the line terminator.
pub fn record_size(cells: &[String]) -> u64 {
    cells.iter().map(|c| c.len() as u64 + 1).sum::<u64>() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{DiskStats, NetStats};
    use chrono::{TimeZone, Utc};

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        snapshot.cpu = 12.346;
        snapshot.memory = 50.0;
        snapshot.disks.insert(
            "sdb".to_string(),
            DiskStats {
                utilization: 1.0,
                await_ms: 2.0,
                iops: 3.0,
            },
        );
        snapshot.disks.insert("sda".to_string(), DiskStats::default());
        snapshot.networks.insert(
            "eth0".to_string(),
            NetStats {
                bandwidth_bps: 16_192_000.0,
            },
        );
        snapshot
    }

    #[test]
    fn test_header_sorted() {
        let schema = ColumnSchema::from_snapshot(&snapshot());
        let header = schema.header();

        assert_eq!(header.len(), schema.width());
        assert_eq!(header[0], "Timestamp");
        assert_eq!(header[4], "Disk [sda] Utilization (%)");
        assert_eq!(header[7], "Disk [sdb] Utilization (%)");
        assert_eq!(header[10], "Network [eth0] Throughput (Mbps)");
    }

    #[test]
    fn test_row_formatting() {
        let zone = OutputZone::resolve("UTC").unwrap();
        let schema = ColumnSchema::from_snapshot(&snapshot());
        let row = schema.row(&snapshot(), &zone);

        assert_eq!(row[0], "2024-01-01 12:00:00");
        assert_eq!(row[1], "12.35");
        assert_eq!(row[2], NOT_AVAILABLE);
        assert_eq!(row[3], "50.00");
        assert_eq!(&row[7..10], &["1.00", "2.00", "3.00"]);
        assert_eq!(row[10], "16.19");
    }

    #[test]
    fn test_missing_device_renders_not_available() {
        let zone = OutputZone::resolve("UTC").unwrap();
        let schema = ColumnSchema::from_snapshot(&snapshot());

        let mut later = snapshot();
        later.disks.remove("sda");
        later.networks.clear();
        later.disks.insert("sdc".to_string(), DiskStats::default());

        let row = schema.row(&later, &zone);
        assert_eq!(row.len(), schema.width());
        assert_eq!(&row[4..7], &[NOT_AVAILABLE, NOT_AVAILABLE, NOT_AVAILABLE]);
        assert_eq!(row[10], NOT_AVAILABLE);
    }

    #[test]
    fn test_record_size() {
        let cells = vec!["ab".to_string(), "cde".to_string()];
        assert_eq!(record_size(&cells), 3 + 4 + 1);
    }
}
