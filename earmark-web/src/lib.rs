//! earmark-web library - authenticated audio browser
//!
//! Routes fall into three groups:
//! - browser pages (`/`) redirect anonymous visitors to `/login`
//! - API and media routes answer anonymous callers with 401 JSON
//! - login, logout, static assets and `/health` are public

use axum::extract::FromRef;
use axum::Router;
use axum_extra::extract::cookie::Key;
use earmark_common::config::Config;
use earmark_common::Catalog;
use std::sync::Arc;

pub mod api;
pub mod cli;

/// Session cookie settings and the access password
pub struct AuthSettings {
    pub password: String,
    pub cookie_name: String,
    pub max_age_secs: u64,
    pub secure_cookies: bool,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            password: config.password.clone(),
            cookie_name: config.session_cookie.clone(),
            max_age_secs: config.session_max_age,
            secure_cookies: config.secure_cookies,
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Media root plus progress store
    pub catalog: Arc<Catalog>,
    pub auth: Arc<AuthSettings>,
    /// Signing key for the session cookie, derived from the configured secret
    pub cookie_key: Key,
}

impl AppState {
    /// Create new application state
    ///
    /// `Config::resolve` guarantees the secret is long enough for key derivation.
    pub fn new(config: &Config, catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            auth: Arc::new(AuthSettings::from_config(config)),
            cookie_key: Key::derive_from(config.secret_key.as_bytes()),
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    // Browser pages: anonymous visitors are sent to the login form
    let pages = Router::new()
        .route("/", get(api::index))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_browser_session,
        ));

    // Programmatic endpoints: anonymous callers get 401 JSON
    let protected = Router::new()
        .route("/media", get(api::stream_media))
        .route(
            "/api/progress",
            get(api::get_progress).post(api::update_progress),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_api_session,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/login", get(api::login_page).post(api::login_submit))
        .route("/logout", post(api::logout))
        .route("/static/earmark.css", get(api::serve_css))
        .route("/static/player.js", get(api::serve_player_js))
        .merge(api::health_routes());

    Router::new()
        .merge(pages)
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
