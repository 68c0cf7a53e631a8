//! In-memory time-series store over record files.
//!
//! Files are either registered (metadata only) or loaded (parsed into
//! columnar arrays). The number of loaded files is capped; registered files
//! are not. All access goes through one reader/writer lock, and parsing runs
//! outside of it so queries are not blocked by a large ingest.

pub mod parse;
pub mod query;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::exporter::schema::TIMESTAMP_COLUMN;

/// Errors reported by the store. None of them leave partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file is not loaded: {0}")]
    NotLoaded(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("file too large ({size} bytes, max {max_mb} MB)")]
    TooLarge { size: u64, max_mb: u64 },

    #[error("file has too many rows (max {0})")]
    TooManyRows(usize),

    #[error("CSV must have at least timestamp and one data column")]
    TooFewColumns,

    #[error("CSV file contains no valid data rows")]
    NoValidRows,

    #[error("maximum number of files ({0}) reached, please delete some files first")]
    LoadedLimit(usize),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Capacity limits of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_loaded_files: usize,
    pub max_file_bytes: u64,
    pub max_rows: usize,
    /// Points returned by a query before downsampling kicks in.
    pub max_points: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_loaded_files: 20,
            max_file_bytes: 200 * 1024 * 1024,
            max_rows: 5_000_000,
            max_points: 2000,
        }
    }
}

/// File metadata as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    /// Full header including the timestamp column; empty until loaded.
    pub columns: Vec<String>,
    pub row_count: usize,
    pub min_time: Option<DateTime<Utc>>,
    pub max_time: Option<DateTime<Utc>>,
    pub is_loaded: bool,
}

impl FileEntry {
    fn registered(id: &str, name: &str, path: &Path) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            path: path.to_path_buf(),
            columns: Vec::new(),
            row_count: 0,
            min_time: None,
            max_time: None,
            is_loaded: false,
        }
    }
}

/// Columnar content of a loaded file. Every series is index-aligned with
/// `timestamps`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnData {
    names: Vec<String>,
    timestamps: Vec<i64>,
    series: Vec<Vec<f64>>,
}

impl ColumnData {
    pub fn new(names: Vec<String>, timestamps: Vec<i64>, series: Vec<Vec<f64>>) -> Self {
        Self {
            names,
            timestamps,
            series,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Unix seconds of each row.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Values of the first column called `name`.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.series.get(idx).map(Vec::as_slice)
    }
}

/// One query result point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Optional inclusive time bounds of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct StoreInner {
    files: HashMap<String, FileEntry>,
    data: HashMap<String, ColumnData>,
}

impl StoreInner {
    /// Loaded files other than `except`.
    fn loaded_count_except(&self, except: &str) -> usize {
        self.files
            .values()
            .filter(|f| f.is_loaded && f.id != except)
            .count()
    }
}

/// Thread-safe registry of record files and their loaded content.
#[derive(Default)]
pub struct TimeSeriesStore {
    inner: RwLock<StoreInner>,
    limits: StoreLimits,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            limits,
        }
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_capacity(&self, inner: &StoreInner, id: &str) -> Result<(), StoreError> {
        if inner.loaded_count_except(id) >= self.limits.max_loaded_files {
            return Err(StoreError::LoadedLimit(self.limits.max_loaded_files));
        }
        Ok(())
    }

    /// Parses `path` and stores it as a loaded file under `id`, replacing any
    /// previous entry with that id.
    pub fn ingest(&self, id: &str, name: &str, path: &Path) -> Result<FileEntry, StoreError> {
        self.check_capacity(&self.read(), id)?;

        let parsed = parse::parse_file(path, &self.limits)?;

        let mut inner = self.write();
        // Another ingest may have finished while this one was parsing
        self.check_capacity(&inner, id)?;

        let entry = FileEntry {
            id: id.to_string(),
            name: name.to_string(),
            path: path.to_path_buf(),
            columns: parsed.header,
            row_count: parsed.data.len(),
            min_time: DateTime::<Utc>::from_timestamp(parsed.min_time, 0),
            max_time: DateTime::<Utc>::from_timestamp(parsed.max_time, 0),
            is_loaded: true,
        };
        inner.files.insert(id.to_string(), entry.clone());
        inner.data.insert(id.to_string(), parsed.data);

        info!(id, rows = entry.row_count, "Loaded record file");
        Ok(entry)
    }

    /// Records a file without reading it. Existing entries are kept as they are.
    pub fn register(&self, id: &str, name: &str, path: &Path) {
        let mut inner = self.write();
        inner
            .files
            .entry(id.to_string())
            .or_insert_with(|| FileEntry::registered(id, name, path));
        debug!(id, "Registered record file");
    }

    /// Loads a registered file's content. A no-op for files already loaded.
    pub fn load_content(&self, id: &str) -> Result<FileEntry, StoreError> {
        let (name, path) = {
            let inner = self.read();
            let entry = inner
                .files
                .get(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if entry.is_loaded {
                return Ok(entry.clone());
            }
            self.check_capacity(&inner, id)?;
            (entry.name.clone(), entry.path.clone())
        };

        let parsed = parse::parse_file(&path, &self.limits)?;

        let mut inner = self.write();
        self.check_capacity(&inner, id)?;
        let Some(entry) = inner.files.get_mut(id) else {
            // Deleted while parsing
            return Err(StoreError::NotFound(id.to_string()));
        };

        entry.name = name;
        entry.columns = parsed.header;
        entry.row_count = parsed.data.len();
        entry.min_time = DateTime::<Utc>::from_timestamp(parsed.min_time, 0);
        entry.max_time = DateTime::<Utc>::from_timestamp(parsed.max_time, 0);
        entry.is_loaded = true;
        let entry = entry.clone();
        inner.data.insert(id.to_string(), parsed.data);

        info!(id, rows = entry.row_count, "Loaded registered record file");
        Ok(entry)
    }

    /// All known files, sorted by display name.
    pub fn list_files(&self) -> Vec<FileEntry> {
        let mut files: Vec<FileEntry> = self.read().files.values().cloned().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        files
    }

    pub fn file(&self, id: &str) -> Option<FileEntry> {
        self.read().files.get(id).cloned()
    }

    /// Metric column names of a file, without the timestamp column.
    pub fn columns(&self, id: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.read();
        let entry = inner
            .files
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        Ok(entry
            .columns
            .iter()
            .filter(|c| c.as_str() != TIMESTAMP_COLUMN)
            .cloned()
            .collect())
    }

    /// Points of `column` within `range`, downsampled to at most
    /// `max_points` when the range holds more raw samples than that.
    pub fn query(
        &self,
        id: &str,
        column: &str,
        range: TimeRange,
    ) -> Result<Vec<DataPoint>, StoreError> {
        let inner = self.read();
        let data = match inner.data.get(id) {
            Some(data) => data,
            None if inner.files.contains_key(id) => {
                return Err(StoreError::NotLoaded(id.to_string()))
            }
            None => return Err(StoreError::NotFound(id.to_string())),
        };
        let values = data
            .column(column)
            .ok_or_else(|| StoreError::ColumnNotFound(column.to_string()))?;

        let (start, end) = query::range_bounds(data.timestamps(), &range);
        Ok(query::collect_points(
            data.timestamps(),
            values,
            start,
            end,
            self.limits.max_points,
        ))
    }

    /// Removes a file. Returns whether it was known.
    pub fn delete(&self, id: &str) -> bool {
        let mut inner = self.write();
        inner.data.remove(id);
        inner.files.remove(id).is_some()
    }

    pub fn delete_all(&self) {
        let mut inner = self.write();
        inner.files.clear();
        inner.data.clear();
    }

    pub fn loaded_count(&self) -> usize {
        self.read().files.values().filter(|f| f.is_loaded).count()
    }

    pub fn file_count(&self) -> usize {
        self.read().files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONTENT: &str = "Timestamp,CPU Utilization (%),CPU IO Wait (%)\n\
                           2024-01-01 00:00:00,10.00,N/A\n\
                           2024-01-01 00:00:30,20.00,1.00\n\
                           2024-01-01 00:01:00,30.00,2.00\n";

    fn write_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, CONTENT).unwrap();
        path
    }

    #[test]
    fn test_ingest_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new();
        let entry = store
            .ingest("a_1", "a", &write_file(dir.path(), "a_1.csv"))
            .unwrap();

        assert!(entry.is_loaded);
        assert_eq!(entry.row_count, 3);
        assert_eq!(
            entry.max_time.unwrap() - entry.min_time.unwrap(),
            chrono::Duration::seconds(60)
        );
        assert_eq!(
            store.columns("a_1").unwrap(),
            vec!["CPU Utilization (%)", "CPU IO Wait (%)"]
        );
    }

    #[test]
    fn test_register_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new();
        let path = write_file(dir.path(), "b_1.csv");
        store.register("b_1", "b", &path);

        let entry = store.file("b_1").unwrap();
        assert!(!entry.is_loaded);
        assert_eq!(entry.row_count, 0);
        assert!(store.columns("b_1").unwrap().is_empty());
        assert!(matches!(
            store.query("b_1", "CPU Utilization (%)", TimeRange::default()),
            Err(StoreError::NotLoaded(_))
        ));

        let loaded = store.load_content("b_1").unwrap();
        assert!(loaded.is_loaded);
        assert_eq!(loaded.row_count, 3);
        // second load is a no-op
        assert_eq!(store.load_content("b_1").unwrap(), loaded);
    }

    #[test]
    fn test_query_skips_nan_and_unknowns() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new();
        store
            .ingest("c", "c", &write_file(dir.path(), "c.csv"))
            .unwrap();

        let points = store
            .query("c", "CPU IO Wait (%)", TimeRange::default())
            .unwrap();
        assert_eq!(points.len(), 2);

        assert!(matches!(
            store.query("c", "Nope", TimeRange::default()),
            Err(StoreError::ColumnNotFound(_))
        ));
        assert!(matches!(
            store.query("missing", "Nope", TimeRange::default()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new();
        store
            .ingest("d", "d", &write_file(dir.path(), "d.csv"))
            .unwrap();

        assert!(store.delete("d"));
        assert!(!store.delete("d"));
        assert_eq!(store.loaded_count(), 0);
    }

    #[test]
    fn test_failed_ingest_leaves_no_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "Timestamp,CPU\nnope,1\n").unwrap();

        let store = TimeSeriesStore::new();
        assert!(matches!(
            store.ingest("bad", "bad", &path),
            Err(StoreError::NoValidRows)
        ));
        assert_eq!(store.file_count(), 0);
    }

    #[test]
    fn test_loaded_cap_on_load_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::with_limits(StoreLimits {
            max_loaded_files: 1,
            ..StoreLimits::default()
        });
        store
            .ingest("one", "one", &write_file(dir.path(), "one.csv"))
            .unwrap();
        store.register("two", "two", &write_file(dir.path(), "two.csv"));

        assert!(matches!(
            store.load_content("two"),
            Err(StoreError::LoadedLimit(1))
        ));
        assert!(!store.file("two").unwrap().is_loaded);

        // Re-ingesting an already loaded id does not count against the cap
        assert!(store
            .ingest("one", "one", &dir.path().join("one.csv"))
            .is_ok());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = TimeSeriesStore::new();
        store.register("z", "zeta", &write_file(dir.path(), "z.csv"));
        store.register("a", "alpha", &write_file(dir.path(), "a.csv"));

        let names: Vec<String> = store.list_files().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
