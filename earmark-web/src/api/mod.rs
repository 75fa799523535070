//! HTTP API handlers for earmark-web

pub mod auth;
pub mod browse;
pub mod error;
pub mod health;
pub mod media;
pub mod progress;
pub mod session;
pub mod ui;

pub use auth::{login_page, login_submit, logout, require_api_session, require_browser_session};
pub use browse::index;
pub use error::ApiError;
pub use health::health_routes;
pub use media::stream_media;
pub use progress::{get_progress, update_progress};
pub use session::SessionJar;
pub use ui::{serve_css, serve_player_js};

/// Run filesystem work off the async runtime
pub(crate) async fn blocking<F, T>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> earmark_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(ApiError::from)?
        .map_err(ApiError::from)
}
