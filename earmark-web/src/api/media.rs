//! Audio file streaming
//!
//! Confinement and type checks run before the file is opened; `ServeFile` then
//! handles Range, HEAD, conditional requests and the content type.

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{header, HeaderValue},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::{blocking, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub path: String,
}

/// GET /media?path=<relative file>
pub async fn stream_media(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let file = blocking(move || catalog.audio_file(&query.path)).await?;

    let response = match ServeFile::new(file.absolute()).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    if let Some(name) = file.file_name() {
        let disposition = format!("inline; filename*=UTF-8''{}", urlencoding::encode(name));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}
