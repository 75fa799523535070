//! Playback progress endpoints
//!
//! Both endpoints validate the file exactly like `/media` does, so progress can
//! only be read or written for playable files inside the media root.

use axum::{
    extract::{Query, State},
    Json,
};
use earmark_common::ProgressRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{blocking, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub file: String,
}

/// Report from the player
#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub file: String,
    pub position: f64,
    pub duration: f64,
}

/// Stored values after an update
#[derive(Debug, Serialize)]
pub struct ProgressUpdateResponse {
    pub status: String,
    #[serde(flatten)]
    pub record: ProgressRecord,
}

/// GET /api/progress?file=<relative file>
///
/// Zeroed record when nothing has been stored yet.
pub async fn get_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<ProgressRecord>, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let record = blocking(move || catalog.progress(&query.file)).await?;
    Ok(Json(record))
}

/// POST /api/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<ProgressUpdateResponse>, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let record = blocking(move || {
        catalog.record_progress(&update.file, update.position, update.duration)
    })
    .await?;

    debug!(
        position = record.position,
        duration = record.duration,
        played = record.played,
        "Progress recorded"
    );

    Ok(Json(ProgressUpdateResponse {
        status: "ok".to_string(),
        record,
    }))
}
