//! Record file management endpoints.
//!
//! Uploaded files are written to the upload directory as `<id>.csv` and
//! loaded into the store right away; files found there at startup are only
//! registered and loaded on demand.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::path::Path as FsPath;
use tracing::{debug, error, info, instrument, warn};

use super::ApiError;
use crate::state::{is_csv, SharedState};
use unostat::{FileEntry, StoreError};

const MAX_NAME_CHARS: usize = 50;
const UPLOAD_FIELD: &str = "file";

/// Reduces an uploaded file name to a safe display name: base name without
/// extension, letters, digits, `-`, `_` and spaces only, at most 50 characters.
pub fn sanitize_filename(name: &str) -> String {
    let base = FsPath::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let base = base.rfind('.').map_or(base, |idx| &base[..idx]);

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            '.' | ':' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' => Some(c),
            _ => None,
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}

/// Unique id for an upload: the sanitized name plus a time and random suffix.
fn upload_id(name: &str) -> String {
    format!(
        "{}_{:x}{:08x}",
        name,
        Utc::now().timestamp(),
        rand::random::<u32>()
    )
}

async fn remove_quietly(path: &FsPath) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Handler for GET /api/files.
#[instrument(skip(state))]
pub async fn list_files_handler(State(state): State<SharedState>) -> Json<Vec<FileEntry>> {
    Json(state.store.list_files())
}

/// Handler for POST /api/files/upload.
#[instrument(skip_all)]
pub async fn upload_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<FileEntry>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("No file provided"))?;

        if !is_csv(FsPath::new(&filename)) {
            return Err(ApiError::bad_request("Only CSV files are allowed"));
        }
        if FsPath::new(&filename).file_name().and_then(|s| s.to_str()) != Some(filename.as_str())
        {
            return Err(ApiError::bad_request("Invalid filename"));
        }

        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        let name = sanitize_filename(&filename);
        let id = upload_id(&name);
        let path = state.upload_dir.join(format!("{}.csv", id));

        tokio::fs::write(&path, &content).await.map_err(|e| {
            error!("Failed to save upload {}: {}", path.display(), e);
            ApiError::internal("Failed to save file")
        })?;

        let store = state.store.clone();
        let (ingest_id, ingest_path) = (id.clone(), path.clone());
        let result =
            tokio::task::spawn_blocking(move || store.ingest(&ingest_id, &name, &ingest_path))
                .await
                .map_err(|e| ApiError::internal(format!("Upload task failed: {}", e)))?;

        return match result {
            Ok(entry) => {
                info!(id = %id, bytes = content.len(), "Uploaded record file");
                Ok(Json(entry))
            }
            Err(e) => {
                warn!("Rejected upload {}: {}", filename, e);
                remove_quietly(&path).await;
                Err(ApiError::bad_request(e.to_string()))
            }
        };
    }

    Err(ApiError::bad_request("No file provided"))
}

/// Handler for DELETE /api/files/{id}. Answers 204 whether or not the file
/// was known.
#[instrument(skip(state))]
pub async fn delete_file_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.store.delete(&id) {
        info!(id = %id, "Deleted record file");
    }
    if let Some(path) = state.upload_path(&id) {
        remove_quietly(&path).await;
    }
    StatusCode::NO_CONTENT
}

/// Handler for DELETE /api/files. Clears the store and every CSV file in the
/// upload directory.
#[instrument(skip(state))]
pub async fn delete_all_handler(State(state): State<SharedState>) -> Result<StatusCode, ApiError> {
    state.store.delete_all();

    let mut entries = tokio::fs::read_dir(&state.upload_dir).await.map_err(|e| {
        error!(
            "Failed to read upload directory {}: {}",
            state.upload_dir.display(),
            e
        );
        ApiError::internal("Failed to read upload directory")
    })?;

    let mut removed = 0;
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if is_csv(&path) {
                    remove_quietly(&path).await;
                    removed += 1;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read upload directory entry: {}", e);
                break;
            }
        }
    }

    info!("Deleted all record files ({} on disk)", removed);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/files/{id}/load.
#[instrument(skip(state))]
pub async fn load_file_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || store.load_content(&id))
        .await
        .map_err(|e| ApiError::internal(format!("Load task failed: {}", e)))?;

    match result {
        Ok(_) => Ok(Json(json!({
            "status": "ok",
            "message": "File loaded successfully",
        }))),
        Err(e) => {
            warn!("Failed to load file: {}", e);
            Err(ApiError::internal(e.to_string()))
        }
    }
}

/// Handler for GET /api/files/{id}/metrics.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .columns(&id)
        .map(|metrics| Json(json!({ "metrics": metrics })))
        .map_err(|e: StoreError| ApiError::not_found(e.to_string()))
}
