//! Session authentication state and CSRF tokens
//!
//! A [`Session`] is the per-client state carried by the transport layer (a signed
//! cookie in earmark-web). Handlers receive it explicitly; the only mutation points
//! are [`Session::ensure_csrf_token`], [`Session::login`] and [`Session::clear`].
//!
//! There is no username concept: a single shared password unlocks the session.

use crate::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Random bytes behind each CSRF token (encoded as 43 URL-safe characters)
pub const CSRF_TOKEN_BYTES: usize = 32;

/// Per-client authentication state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    authenticated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    csrf_token: Option<String>,

    /// Unix seconds at which the transport last issued this session
    #[serde(default)]
    issued_at: i64,

    #[serde(skip)]
    modified: bool,
}

impl Session {
    /// True iff the session carries the authenticated flag
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Fail with `Unauthenticated` unless the session is authenticated
    pub fn require_authenticated(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(Error::Unauthenticated)
        }
    }

    /// Return the session's CSRF token, minting one on first use
    pub fn ensure_csrf_token(&mut self) -> String {
        if let Some(token) = &self.csrf_token {
            return token.clone();
        }
        let token = generate_token();
        self.csrf_token = Some(token.clone());
        self.modified = true;
        token
    }

    /// Constant-time comparison of a submitted token against the stored one
    ///
    /// False when either side is absent or empty.
    pub fn validate_csrf_token(&self, submitted: &str) -> bool {
        match &self.csrf_token {
            Some(expected) if !expected.is_empty() && !submitted.is_empty() => {
                constant_time_eq(submitted.as_bytes(), expected.as_bytes())
            }
            _ => false,
        }
    }

    /// Fail with `InvalidCsrf` unless the submitted token matches
    pub fn require_csrf_token(&self, submitted: &str) -> Result<()> {
        if self.validate_csrf_token(submitted) {
            Ok(())
        } else {
            Err(Error::InvalidCsrf)
        }
    }

    /// Attempt login with the shared password
    ///
    /// On success the session becomes authenticated and its CSRF token is rotated,
    /// so a token handed out before login no longer validates. On failure the
    /// session is left untouched.
    pub fn login(&mut self, submitted_password: &str, expected_password: &str) -> bool {
        if !verify_password(submitted_password, expected_password) {
            return false;
        }
        self.authenticated = true;
        self.csrf_token = None;
        self.ensure_csrf_token();
        self.modified = true;
        true
    }

    /// Drop everything the session holds
    pub fn clear(&mut self) {
        *self = Session {
            modified: true,
            ..Session::default()
        };
    }

    /// True when the session holds no state worth persisting
    pub fn is_empty(&self) -> bool {
        !self.authenticated && self.csrf_token.is_none()
    }

    /// True when a mutation happened since the session was loaded
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    /// Stamp the issue time; called by the transport whenever it re-issues the session
    pub fn mark_issued(&mut self, now: i64) {
        self.issued_at = now;
    }

    /// True when the session is older than `max_age_secs` at `now`
    pub fn is_expired(&self, max_age_secs: u64, now: i64) -> bool {
        let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
        now.saturating_sub(self.issued_at) > max_age
    }
}

/// Mint a cryptographically random, URL-safe token
pub fn generate_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare a submitted password against the configured one without early exit
pub fn verify_password(submitted: &str, expected: &str) -> bool {
    constant_time_eq(submitted.as_bytes(), expected.as_bytes())
}

/// Byte comparison whose running time depends only on the lengths
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Post-login destination: `next` when it is a same-origin absolute path, else `/`
///
/// Protocol-relative forms (`//host`, `/\host`) start with `/` but leave the origin.
/// Browsers drop tab, CR and LF while parsing a Location, so `/\t/host` is also
/// protocol-relative; any ASCII control character rejects the target.
pub fn safe_redirect_target(next: &str) -> &str {
    let same_origin = next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(|c| c.is_ascii_control());
    if same_origin {
        next
    } else {
        "/"
    }
}
