//! Application state management for the visualization server.
//!
//! This module defines the shared state passed to HTTP handlers and the
//! startup scan that registers previously uploaded files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use unostat::TimeSeriesStore;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub store: Arc<TimeSeriesStore>,
    /// Directory uploaded files are written to.
    pub upload_dir: PathBuf,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<TimeSeriesStore>, upload_dir: PathBuf) -> Self {
        Self {
            store,
            upload_dir,
            start_time: Instant::now(),
        }
    }

    /// On-disk location of an uploaded file, or None when `id` is not a plain
    /// file name.
    pub fn upload_path(&self, id: &str) -> Option<PathBuf> {
        if id.is_empty() || id.starts_with('.') || Path::new(id).file_name()? != id {
            return None;
        }
        Some(self.upload_dir.join(format!("{}.csv", id)))
    }
}

pub fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Display name for a stored id: the part before the last `_`, which is where
/// the upload suffix starts.
pub fn display_name(id: &str) -> &str {
    match id.rfind('_') {
        Some(idx) if idx > 0 => &id[..idx],
        _ => id,
    }
}

/// Creates `dir` if needed and registers every CSV file in it without
/// reading content. Returns the number of files registered.
pub fn scan_upload_dir(store: &TimeSeriesStore, dir: &Path) -> io::Result<usize> {
    fs::create_dir_all(dir)?;

    let mut registered = 0;
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read upload directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || !is_csv(&path) {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        store.register(id, display_name(id), &path);
        registered += 1;
    }

    debug!("Registered {} files from {}", registered, dir.display());
    Ok(registered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("server-a_65f0c2a1deadbeef"), "server-a");
        assert_eq!(display_name("host_2024_abc"), "host_2024");
        assert_eq!(display_name("plain"), "plain");
        assert_eq!(display_name("_leading"), "_leading");
    }

    #[test]
    fn test_upload_path_rejects_traversal() {
        let state = AppState::new(Arc::new(TimeSeriesStore::new()), PathBuf::from("/data"));
        assert_eq!(
            state.upload_path("node_1"),
            Some(PathBuf::from("/data/node_1.csv"))
        );
        assert_eq!(state.upload_path("../etc/passwd"), None);
        assert_eq!(state.upload_path(".."), None);
        assert_eq!(state.upload_path(""), None);
    }

    #[test]
    fn test_scan_upload_dir_registers_csv_only() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        fs::create_dir_all(&uploads).unwrap();
        fs::write(uploads.join("web_abc123.csv"), "Timestamp,CPU\n").unwrap();
        fs::write(uploads.join("db_1.CSV"), "Timestamp,CPU\n").unwrap();
        fs::write(uploads.join("notes.txt"), "hello").unwrap();

        let store = TimeSeriesStore::new();
        assert_eq!(scan_upload_dir(&store, &uploads).unwrap(), 2);

        let entry = store.file("web_abc123").unwrap();
        assert_eq!(entry.name, "web");
        assert!(!entry.is_loaded);
        assert!(store.file("db_1").is_some());
    }

    #[test]
    fn test_scan_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("new");
        let store = TimeSeriesStore::new();
        assert_eq!(scan_upload_dir(&store, &uploads).unwrap(), 0);
        assert!(uploads.is_dir());
    }
}
