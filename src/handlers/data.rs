//! Time-range data endpoint handler.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::ApiError;
use crate::state::SharedState;
use unostat::{DataPoint, TimeRange};

/// Optional RFC 3339 bounds of a data query.
#[derive(Debug, Default, Deserialize)]
pub struct DataQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

fn parse_bound(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            debug!("Ignoring unparseable time bound {:?}: {}", value, e);
            None
        }
    }
}

impl DataQuery {
    /// Range covered by this query. Missing or unparseable bounds are open.
    pub fn range(&self) -> TimeRange {
        TimeRange {
            from: parse_bound(self.from.as_deref()),
            to: parse_bound(self.to.as_deref()),
        }
    }
}

/// Handler for GET /api/data/{file_id}/{metric}.
#[instrument(skip(state, query))]
pub async fn data_handler(
    State(state): State<SharedState>,
    Path((file_id, metric)): Path<(String, String)>,
    Query(query): Query<DataQuery>,
) -> Result<Json<Vec<DataPoint>>, ApiError> {
    let points = state
        .store
        .query(&file_id, &metric, query.range())
        .map_err(|e| ApiError::not_found(e.to_string()))?;

    debug!(points = points.len(), "Served data query");
    Ok(Json(points))
}
