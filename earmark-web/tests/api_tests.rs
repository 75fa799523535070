//! Integration tests for earmark-web endpoints
//!
//! Tests cover:
//! - Directory page listing, ordering and navigation
//! - Media streaming: confinement, type checks, Range requests
//! - Progress read/update and the completion policy
//! - Health and static assets (no auth required)

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use helpers::*;
use serde_json::json;

// =============================================================================
// Health and static assets
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup();

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "earmark");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_static_assets_are_public() {
    let app = setup();

    let css = app.get("/static/earmark.css", None).await;
    assert_eq!(css.status(), StatusCode::OK);
    assert!(css.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/css"));

    let js = app.get("/static/player.js", None).await;
    assert_eq!(js.status(), StatusCode::OK);
    assert!(body_string(js).await.contains("/api/progress"));
}

// =============================================================================
// Directory page
// =============================================================================

#[tokio::test]
async fn test_index_lists_directories_then_audio_sorted() {
    let app = setup();
    let session = app.login().await;

    let response = app.get("/", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;

    let sub = html.find(">sub/<").expect("sub directory listed");
    let a = html.find(">a.mp3<").expect("a.mp3 listed");
    let b = html.find(">B.wav<").expect("B.wav listed");
    assert!(sub < a && a < b, "unexpected order in {}", html);

    assert!(!html.contains(".hidden.mp3"));
    assert!(!html.contains("notes.txt"));
    // No parent link at the root
    assert!(!html.contains(r#"class="directory parent""#));
}

#[tokio::test]
async fn test_index_subdirectory_has_breadcrumbs_and_parent() {
    let app = setup();
    let session = app.login().await;

    let html = body_string(app.get("/?path=sub", Some(&session.cookie)).await).await;

    assert!(html.contains(r#"<li class="directory parent"><a href="/">..</a></li>"#));
    assert!(html.contains(r#"<a href="/?path=sub">sub</a>"#));
    assert!(html.contains(r#"data-src="/media?path=sub%2Finner.ogg""#));
    assert!(html.contains(">long.mp3<"));
}

#[tokio::test]
async fn test_index_rejects_escape_and_missing_directory() {
    let app = setup();
    let session = app.login().await;

    let response = app.get("/?path=..%2F..", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/?path=nowhere", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Not found: Directory not found");

    let response = app.get("/?path=a.mp3", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Media streaming
// =============================================================================

#[tokio::test]
async fn test_media_streams_whole_file() {
    let app = setup();
    let session = app.login().await;

    let response = app.get("/media?path=sub%2Flong.mp3", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "inline; filename*=UTF-8''long.mp3"
    );
    assert_eq!(body_bytes(response).await.len(), LONG_FILE_LEN);
}

#[tokio::test]
async fn test_media_honors_range_requests() {
    let app = setup();
    let session = app.login().await;

    let request = Request::builder()
        .uri("/media?path=sub%2Flong.mp3")
        .header(header::COOKIE, &session.cookie)
        .header(header::RANGE, "bytes=100-199")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE],
        format!("bytes 100-199/{}", LONG_FILE_LEN).as_str()
    );
    let bytes = body_bytes(response).await;
    assert_eq!(bytes.len(), 100);
    assert_eq!(bytes[0], (100 % 251) as u8);
}

#[tokio::test]
async fn test_media_path_escape_is_client_error() {
    let app = setup();
    let session = app.login().await;

    for uri in [
        "/media?path=../../etc/passwd",
        "/media?path=..%2F..%2Fetc%2Fpasswd",
        "/media?path=%2Fetc%2Fpasswd",
    ] {
        let response = app.get(uri, Some(&session.cookie)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Requested path is outside the media root");
    }
}

#[tokio::test]
async fn test_media_rejects_unsupported_missing_and_directory() {
    let app = setup();
    let session = app.login().await;

    let response = app.get("/media?path=notes.txt", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Unsupported file type");

    let response = app.get("/media?path=ghost.mp3", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/media?path=sub", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_media_requires_path_parameter() {
    let app = setup();
    let session = app.login().await;

    let response = app.get("/media", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Progress
// =============================================================================

#[tokio::test]
async fn test_progress_defaults_to_zero() {
    let app = setup();
    let session = app.login().await;

    let response = app.get("/api/progress?file=a.mp3", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"position": 0.0, "duration": 0.0, "played": false})
    );
}

#[tokio::test]
async fn test_progress_update_then_read() {
    let app = setup();
    let session = app.login().await;

    let response = app
        .post_json(
            "/api/progress",
            Some(&session.cookie),
            json!({"file": "a.mp3", "position": 42.5, "duration": 300.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"status": "ok", "position": 42.5, "duration": 300.0, "played": false})
    );

    let response = app.get("/api/progress?file=a.mp3", Some(&session.cookie)).await;
    assert_eq!(
        body_json(response).await,
        json!({"position": 42.5, "duration": 300.0, "played": false})
    );
}

#[tokio::test]
async fn test_progress_completion_resets_position_and_sticks() {
    let app = setup();
    let session = app.login().await;

    let response = app
        .post_json(
            "/api/progress",
            Some(&session.cookie),
            json!({"file": "a.mp3", "position": 96.0, "duration": 100.0}),
        )
        .await;
    assert_eq!(
        body_json(response).await,
        json!({"status": "ok", "position": 0.0, "duration": 100.0, "played": true})
    );

    // Replaying from the start keeps the played flag
    let response = app
        .post_json(
            "/api/progress",
            Some(&session.cookie),
            json!({"file": "a.mp3", "position": 10.0, "duration": 100.0}),
        )
        .await;
    assert_eq!(
        body_json(response).await,
        json!({"status": "ok", "position": 10.0, "duration": 100.0, "played": true})
    );

    // And the listing marks it
    let html = body_string(app.get("/", Some(&session.cookie)).await).await;
    assert!(html.contains(r#"<li class="audio played"><button type="button" data-file="a.mp3""#), "{}", html);
}

#[tokio::test]
async fn test_progress_clamps_negative_values() {
    let app = setup();
    let session = app.login().await;

    let response = app
        .post_json(
            "/api/progress",
            Some(&session.cookie),
            json!({"file": "B.wav", "position": -5.0, "duration": -1.0}),
        )
        .await;
    assert_eq!(
        body_json(response).await,
        json!({"status": "ok", "position": 0.0, "duration": 0.0, "played": false})
    );
}

#[tokio::test]
async fn test_progress_keys_are_normalized() {
    let app = setup();
    let session = app.login().await;

    app.post_json(
        "/api/progress",
        Some(&session.cookie),
        json!({"file": "./sub//inner.ogg", "position": 7.0, "duration": 70.0}),
    )
    .await;

    let response = app.get("/api/progress?file=sub%2Finner.ogg", Some(&session.cookie)).await;
    assert_eq!(body_json(response).await["position"], 7.0);

    let stored = std::fs::read_to_string(app.data.join("progress.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert!(stored.get("sub/inner.ogg").is_some(), "{}", stored);
}

#[tokio::test]
async fn test_progress_rejects_escape_and_unsupported_files() {
    let app = setup();
    let session = app.login().await;

    let response = app
        .post_json(
            "/api/progress",
            Some(&session.cookie),
            json!({"file": "../outside.mp3", "position": 1.0, "duration": 2.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/api/progress?file=notes.txt", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/api/progress?file=ghost.mp3", Some(&session.cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Nothing was written for the rejected update
    let stored = std::fs::read_to_string(app.data.join("progress.json")).unwrap();
    assert_eq!(stored.trim(), "{}");
}

#[tokio::test]
async fn test_progress_unauthenticated_then_authenticated() {
    let app = setup();

    let response = app
        .post_json("/api/progress", None, json!({"file": "a.mp3", "position": 1.0, "duration": 2.0}))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let session = app.login().await;
    let response = app
        .post_json(
            "/api/progress",
            Some(&session.cookie),
            json!({"file": "a.mp3", "position": 1.0, "duration": 2.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
