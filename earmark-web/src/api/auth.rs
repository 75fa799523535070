//! Authentication gate, login and logout
//!
//! Two middlewares guard the protected routes: browser pages redirect anonymous
//! visitors to `/login?next=<original path>`, programmatic endpoints answer with
//! 401 JSON. The login form and logout both require the session's CSRF token.

use axum::{
    extract::{Query, Request, State},
    http::{StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use earmark_common::session::safe_redirect_target;
use earmark_common::Error;
use serde::Deserialize;
use tracing::{info, warn};

use super::{ui, ApiError, SessionJar};
use crate::AppState;

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please try again.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Gate for browser pages
pub async fn require_browser_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session = SessionJar::from_headers(request.headers(), &state);
    if session.session().is_authenticated() {
        return next.run(request).await;
    }
    login_redirect(request.uri()).into_response()
}

/// Gate for media and JSON endpoints
pub async fn require_api_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    SessionJar::from_headers(request.headers(), &state)
        .session()
        .require_authenticated()?;
    Ok(next.run(request).await)
}

/// 303 to the login form, remembering where the visitor was headed
fn login_redirect(uri: &Uri) -> Redirect {
    let original = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Redirect::to(&format!("/login?next={}", urlencoding::encode(original)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: String,
}

/// Login form submission; the form also posts a `username`, which is ignored
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub next_path: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutForm {
    #[serde(default)]
    pub csrf_token: String,
}

/// GET /login
///
/// Already-authenticated visitors go straight to `next`.
pub async fn login_page(session: SessionJar, Query(query): Query<LoginQuery>) -> Response {
    if session.session().is_authenticated() {
        return Redirect::to(safe_redirect_target(&query.next)).into_response();
    }
    render_login(session, &query.next, None, StatusCode::OK)
}

/// POST /login
pub async fn login_submit(
    State(state): State<AppState>,
    mut session: SessionJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if !session.session().validate_csrf_token(&form.csrf_token) {
        warn!("Login rejected: missing or invalid CSRF token");
        return render_login(
            session,
            &form.next_path,
            Some(SESSION_EXPIRED_MESSAGE),
            StatusCode::BAD_REQUEST,
        );
    }

    if session.session_mut().login(&form.password, &state.auth.password) {
        info!("Login succeeded");
        let target = safe_redirect_target(&form.next_path).to_string();
        return (session.into_jar(), Redirect::to(&target)).into_response();
    }

    warn!("Login failed: wrong password");
    render_login(
        session,
        &form.next_path,
        Some(INVALID_CREDENTIALS_MESSAGE),
        StatusCode::UNAUTHORIZED,
    )
}

/// POST /logout
pub async fn logout(
    mut session: SessionJar,
    Form(form): Form<LogoutForm>,
) -> Result<Response, ApiError> {
    if !session.session().validate_csrf_token(&form.csrf_token) {
        warn!("Logout rejected: missing or invalid CSRF token");
        return Err(Error::InvalidCsrf.into());
    }

    session.session_mut().clear();
    info!("Logged out");
    Ok((session.into_jar(), Redirect::to("/login")).into_response())
}

fn render_login(
    mut session: SessionJar,
    next_path: &str,
    error: Option<&str>,
    status: StatusCode,
) -> Response {
    let token = session.session_mut().ensure_csrf_token();
    let page = ui::login_page(next_path, error, &token);
    (status, session.into_jar(), Html(page)).into_response()
}
