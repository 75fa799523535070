//! HTML pages and static assets
//!
//! Pages are assembled with `format!`; every interpolated value goes through
//! [`escape_html`], and values placed in URLs are percent-encoded first.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use earmark_common::catalog::{DirectoryEntry, DirectoryListing};

const EARMARK_CSS: &str = include_str!("../../static/earmark.css");
const PLAYER_JS: &str = include_str!("../../static/player.js");

/// GET /static/earmark.css
pub async fn serve_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        EARMARK_CSS,
    )
        .into_response()
}

/// GET /static/player.js
pub async fn serve_player_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        PLAYER_JS,
    )
        .into_response()
}

/// Everything the directory page shows
pub struct IndexPage<'a> {
    pub media_root: String,
    pub listing: &'a DirectoryListing,
    pub breadcrumbs: &'a [DirectoryEntry],
    pub parent_path: Option<&'a str>,
    pub csrf_token: &'a str,
}

pub fn login_page(next_path: &str, error: Option<&str>, csrf_token: &str) -> String {
    let error_html = error
        .map(|message| format!(r#"<p class="error" role="alert">{}</p>"#, escape_html(message)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Sign in - earmark</title>
<link rel="stylesheet" href="/static/earmark.css">
</head>
<body class="login">
<main>
<h1>earmark</h1>
{error_html}
<form method="post" action="/login">
<input type="hidden" name="csrf_token" value="{csrf_token}">
<input type="hidden" name="next_path" value="{next_path}">
<label>Username <input type="text" name="username" autocomplete="username"></label>
<label>Password <input type="password" name="password" autocomplete="current-password" required autofocus></label>
<button type="submit">Sign in</button>
</form>
</main>
</body>
</html>
"#,
        error_html = error_html,
        csrf_token = escape_html(csrf_token),
        next_path = escape_html(next_path),
    )
}

pub fn index_page(page: &IndexPage<'_>) -> String {
    let mut crumbs = format!(r#"<a href="/">{}</a>"#, escape_html(&page.media_root));
    for crumb in page.breadcrumbs {
        crumbs.push_str(&format!(
            r#" / <a href="{}">{}</a>"#,
            escape_html(&browse_href(&crumb.path)),
            escape_html(&crumb.name)
        ));
    }

    let mut rows = String::new();
    if let Some(parent) = page.parent_path {
        rows.push_str(&format!(
            r#"<li class="directory parent"><a href="{}">..</a></li>
"#,
            escape_html(&browse_href(parent))
        ));
    }
    for directory in &page.listing.directories {
        rows.push_str(&format!(
            r#"<li class="directory"><a href="{}">{}/</a></li>
"#,
            escape_html(&browse_href(&directory.path)),
            escape_html(&directory.name)
        ));
    }
    for audio in &page.listing.audio_files {
        let class = if audio.played { "audio played" } else { "audio" };
        rows.push_str(&format!(
            r#"<li class="{class}"><button type="button" data-file="{file}" data-src="{src}">{name}</button></li>
"#,
            class = class,
            file = escape_html(&audio.path),
            src = escape_html(&media_href(&audio.path)),
            name = escape_html(&audio.name),
        ));
    }
    if rows.is_empty() {
        rows.push_str("<li class=\"empty\">No audio here</li>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>earmark</title>
<link rel="stylesheet" href="/static/earmark.css">
</head>
<body>
<header>
<nav class="breadcrumbs">{crumbs}</nav>
<form method="post" action="/logout" class="logout">
<input type="hidden" name="csrf_token" value="{csrf_token}">
<button type="submit">Sign out</button>
</form>
</header>
<main>
<ul class="listing">
{rows}</ul>
</main>
<footer>
<p id="now-playing"></p>
<audio id="player" controls preload="metadata"></audio>
</footer>
<script src="/static/player.js"></script>
</body>
</html>
"#,
        crumbs = crumbs,
        csrf_token = escape_html(page.csrf_token),
        rows = rows,
    )
}

fn browse_href(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/?path={}", urlencoding::encode(path))
    }
}

fn media_href(path: &str) -> String {
    format!("/media?path={}", urlencoding::encode(path))
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
