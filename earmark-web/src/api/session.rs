//! Signed-cookie transport for [`Session`]
//!
//! The session travels as base64 JSON inside a cookie signed with the key derived
//! from the configured secret. A missing, tampered, undecodable or expired cookie
//! yields a fresh anonymous session. Handlers mutate the session through
//! [`SessionJar::session_mut`] and return [`SessionJar::into_jar`] alongside their
//! response; the cookie is rewritten only when the session changed.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cookie::time::Duration;
use earmark_common::Session;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error};

use crate::{AppState, AuthSettings};

/// Request-scoped session plus the cookie jar it was read from
pub struct SessionJar {
    session: Session,
    jar: SignedCookieJar,
    settings: Arc<AuthSettings>,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionJar {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, state))
    }
}

impl SessionJar {
    /// Read the session cookie out of request headers
    pub fn from_headers(headers: &HeaderMap, state: &AppState) -> Self {
        let jar = SignedCookieJar::from_headers(headers, state.cookie_key.clone());
        let session = load_session(&jar, &state.auth, chrono::Utc::now().timestamp());
        Self {
            session,
            jar,
            settings: Arc::clone(&state.auth),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Jar to return with the response, carrying the updated cookie if any
    pub fn into_jar(self) -> SignedCookieJar {
        let Self {
            mut session,
            jar,
            settings,
        } = self;

        if !session.is_modified() {
            return jar;
        }

        if session.is_empty() {
            debug!("Removing session cookie");
            return jar.remove(Cookie::build(settings.cookie_name.clone()).path("/"));
        }

        session.mark_issued(chrono::Utc::now().timestamp());
        match encode_session(&session) {
            Some(value) => jar.add(session_cookie(&settings, value)),
            None => jar,
        }
    }
}

fn session_cookie(settings: &AuthSettings, value: String) -> Cookie<'static> {
    let max_age = i64::try_from(settings.max_age_secs).unwrap_or(i64::MAX);
    Cookie::build((settings.cookie_name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure_cookies)
        .max_age(Duration::seconds(max_age))
        .build()
}

fn encode_session(session: &Session) -> Option<String> {
    match serde_json::to_vec(session) {
        Ok(bytes) => Some(URL_SAFE_NO_PAD.encode(bytes)),
        Err(e) => {
            error!("Failed to encode session: {}", e);
            None
        }
    }
}

/// Session carried by the jar, or an anonymous one
fn load_session(jar: &SignedCookieJar, settings: &AuthSettings, now: i64) -> Session {
    // `get` only returns cookies whose signature verifies
    let Some(cookie) = jar.get(&settings.cookie_name) else {
        return Session::default();
    };

    let decoded = URL_SAFE_NO_PAD
        .decode(cookie.value())
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Session>(&bytes).ok());

    match decoded {
        Some(session) if session.is_expired(settings.max_age_secs, now) => {
            debug!("Session cookie expired");
            Session::default()
        }
        Some(session) => session,
        None => {
            debug!("Discarding undecodable session cookie");
            Session::default()
        }
    }
}
