//! Directory browsing page

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use earmark_common::catalog::{breadcrumbs, parent_path};
use serde::Deserialize;
use std::sync::Arc;

use super::{blocking, ui, ApiError, SessionJar};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub path: String,
}

/// GET /?path=<relative dir>
pub async fn index(
    State(state): State<AppState>,
    mut session: SessionJar,
    Query(query): Query<BrowseQuery>,
) -> Result<Response, ApiError> {
    let catalog = Arc::clone(&state.catalog);
    let listing = blocking(move || catalog.list(&query.path)).await?;

    let csrf_token = session.session_mut().ensure_csrf_token();
    let crumbs = breadcrumbs(&listing.path);
    let parent = parent_path(&listing.path);
    let page = ui::IndexPage {
        media_root: state.catalog.root().display_name(),
        listing: &listing,
        breadcrumbs: &crumbs,
        parent_path: parent.as_deref(),
        csrf_token: &csrf_token,
    };

    Ok((session.into_jar(), Html(ui::index_page(&page))).into_response())
}
