//! Record file parsing into columnar arrays.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::File;
use std::path::Path;

use super::{ColumnData, StoreError, StoreLimits};
use crate::exporter::NOT_AVAILABLE;

/// Naive timestamp layouts accepted in the first column, tried in order.
/// Naive values are read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];

/// Parses a row timestamp into Unix seconds. RFC 3339 values keep their
/// offset; the naive layouts are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, NAIVE_FORMATS[0]) {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).timestamp());
    }
    NAIVE_FORMATS[1..]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}

/// Parses a numeric cell. Empty, `N/A` and unparseable cells become NaN.
pub fn parse_cell(value: &str) -> f64 {
    let value = value.trim();
    if value.is_empty() || value == NOT_AVAILABLE {
        return f64::NAN;
    }
    value.parse::<f64>().unwrap_or(f64::NAN)
}

/// Result of parsing a record file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Full header, timestamp column included.
    pub header: Vec<String>,
    pub data: ColumnData,
    pub min_time: i64,
    pub max_time: i64,
}

/// Reads and parses a record file, enforcing size and row limits.
pub fn parse_file(path: &Path, limits: &StoreLimits) -> Result<ParsedFile, StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > limits.max_file_bytes {
        return Err(StoreError::TooLarge {
            size,
            max_mb: limits.max_file_bytes / (1024 * 1024),
        });
    }

    let file = File::open(path).map_err(io_err)?;
    parse_reader(file, limits)
}

/// Parses record content from any reader.
pub fn parse_reader<R: std::io::Read>(
    reader: R,
    limits: &StoreLimits,
) -> Result<ParsedFile, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if header.len() < 2 {
        return Err(StoreError::TooFewColumns);
    }

    let series_count = header.len() - 1;
    let mut timestamps = Vec::with_capacity(1024);
    let mut series: Vec<Vec<f64>> = vec![Vec::with_capacity(1024); series_count];
    let mut min_time = i64::MAX;
    let mut max_time = i64::MIN;

    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        if timestamps.len() >= limits.max_rows {
            return Err(StoreError::TooManyRows(limits.max_rows));
        }

        let Some(ts) = record.get(0).and_then(parse_timestamp) else {
            continue;
        };

        timestamps.push(ts);
        min_time = min_time.min(ts);
        max_time = max_time.max(ts);

        for (idx, column) in series.iter_mut().enumerate() {
            column.push(record.get(idx + 1).map(parse_cell).unwrap_or(f64::NAN));
        }
    }

    if timestamps.is_empty() {
        return Err(StoreError::NoValidRows);
    }

    Ok(ParsedFile {
        data: ColumnData::new(header[1..].to_vec(), timestamps, series),
        header,
        min_time,
        max_time,
    })
}
