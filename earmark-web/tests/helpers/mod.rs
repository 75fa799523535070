//! Test Helper Utilities
//!
//! Builds a router over a temporary media tree and drives it with `oneshot`,
//! carrying the session cookie between requests by hand.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use earmark_common::config::{Config, ConfigOverrides};
use earmark_common::{Catalog, MediaRoot, ProgressStore};
use earmark_web::{build_router, AppState};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const PASSWORD: &str = "open sesame";
pub const COOKIE_NAME: &str = "earmark_session";
/// Size of `sub/long.mp3`, for Range tests
pub const LONG_FILE_LEN: usize = 1000;

pub struct TestApp {
    pub router: Router,
    pub media: PathBuf,
    pub data: PathBuf,
    _dir: TempDir,
}

/// Media tree:
/// ```text
/// media/
///   .hidden.mp3  B.wav  a.mp3  notes.txt
///   sub/
///     inner.ogg  long.mp3
/// ```
pub fn setup() -> TestApp {
    let dir = TempDir::new().unwrap();
    let media = dir.path().join("media");
    let data = dir.path().join("data");
    fs::create_dir_all(media.join("sub")).unwrap();
    for name in ["a.mp3", "B.wav", ".hidden.mp3", "notes.txt", "sub/inner.ogg"] {
        fs::write(media.join(name), b"not really audio").unwrap();
    }
    let long: Vec<u8> = (0..LONG_FILE_LEN).map(|i| (i % 251) as u8).collect();
    fs::write(media.join("sub/long.mp3"), long).unwrap();

    let config = Config::resolve(
        ConfigOverrides {
            secret_key: Some(SECRET.to_string()),
            password: Some(PASSWORD.to_string()),
            secure_cookies: Some(false),
            media_root: Some(media.clone()),
            data_dir: Some(data.clone()),
            ..ConfigOverrides::default()
        },
        None,
    )
    .unwrap();

    let root = MediaRoot::open(&config.media_root).unwrap();
    let store = ProgressStore::open(&config.data_dir).unwrap();
    let state = AppState::new(&config, Catalog::new(root, Arc::new(store)));

    TestApp {
        router: build_router(state),
        media,
        data,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Response<Body> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, json: Value) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(json.to_string())).unwrap()).await
    }

    /// Fetch the login form: returns the anonymous session cookie and its CSRF token
    pub async fn login_form(&self) -> (String, String) {
        let response = self.get("/login", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response).expect("login form should set a session cookie");
        let token = csrf_token(&body_string(response).await);
        (cookie, token)
    }

    /// Full login; returns the authenticated cookie and the post-login CSRF token
    pub async fn login(&self) -> LoggedIn {
        let (cookie, token) = self.login_form().await;
        let response = self
            .post_form(
                "/login",
                Some(&cookie),
                &[
                    ("username", "anyone"),
                    ("password", PASSWORD),
                    ("csrf_token", token.as_str()),
                    ("next_path", ""),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie(&response).expect("login should reissue the session cookie");

        let index = self.get("/", Some(&cookie)).await;
        assert_eq!(index.status(), StatusCode::OK);
        let csrf = csrf_token(&body_string(index).await);

        LoggedIn {
            cookie,
            csrf,
            pre_login_csrf: token,
        }
    }
}

pub struct LoggedIn {
    /// `name=value` ready for a Cookie header
    pub cookie: String,
    pub csrf: String,
    pub pre_login_csrf: String,
}

/// `name=value` of the session cookie set by a response, if any
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie_header(response).map(|header| header.split(';').next().unwrap_or_default().trim().to_string())
}

/// Full Set-Cookie header for the session cookie, attributes included
pub fn set_cookie_header(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{}=", COOKIE_NAME)))
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response should carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Value of the first `csrf_token` hidden input in a page
pub fn csrf_token(html: &str) -> String {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker).expect("page should contain a CSRF token") + marker.len();
    let end = html[start..].find('"').unwrap() + start;
    html[start..end].to_string()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Should parse JSON")
}
