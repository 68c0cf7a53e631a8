//! Build information endpoint handler.

use axum::Json;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub date: &'static str,
}

/// Build metadata emitted by the build script.
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        date: option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
    }
}

/// Handler for the /api/version endpoint.
#[instrument]
pub async fn version_handler() -> Json<VersionInfo> {
    debug!("Processing /api/version request");
    Json(version_info())
}
