//! HTTP endpoint handlers for the visualization server.
//!
//! This module provides handlers for the JSON API over the time-series store:
//! - `/api/version`: build information
//! - `/api/files`: list, upload and delete record files
//! - `/api/files/{id}/load`, `/api/files/{id}/metrics`: load content, list columns
//! - `/api/data/{file_id}/{metric}`: range query with downsampling

pub mod data;
pub mod files;
pub mod version;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use crate::state::SharedState;

// Re-export handlers
pub use data::data_handler;
pub use files::{
    delete_all_handler, delete_file_handler, list_files_handler, load_file_handler,
    metrics_handler, sanitize_filename, upload_handler,
};
pub use version::version_handler;

/// Extra room on top of the file size limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// JSON error body: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Builds the API router.
pub fn router(state: SharedState) -> Router {
    let body_limit = state.store.limits().max_file_bytes as usize + MULTIPART_OVERHEAD;

    Router::new()
        .route("/api/version", get(version_handler))
        .route(
            "/api/files",
            get(list_files_handler).delete(delete_all_handler),
        )
        .route(
            "/api/files/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/files/{id}", delete(delete_file_handler))
        .route("/api/files/{id}/load", post(load_file_handler))
        .route("/api/files/{id}/metrics", get(metrics_handler))
        .route("/api/data/{file_id}/{metric}", get(data_handler))
        .layer(middleware::map_response(no_store))
        .with_state(state)
}
