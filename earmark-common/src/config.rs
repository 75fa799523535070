//! Configuration loading and validation
//!
//! Resolution priority for each setting:
//! 1. Command-line flag or environment variable (collected by the binary into
//!    [`ConfigOverrides`])
//! 2. TOML bootstrap file ([`TomlConfig`], non-secret settings only)
//! 3. Compiled default
//!
//! The session secret and the access password have no default and are never read
//! from the TOML file. Missing or too-short secrets are fatal.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const MIN_SECRET_KEY_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_SESSION_COOKIE: &str = "earmark_session";
/// One week
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 604_800;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub media_root: Option<PathBuf>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default)]
    pub session_max_age: Option<u64>,
    #[serde(default)]
    pub secure_cookies: Option<bool>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// EnvFilter directive (trace, debug, info, warn, error, or per-target)
    #[serde(default)]
    pub level: Option<String>,
}

/// Settings supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub secret_key: Option<String>,
    pub password: Option<String>,
    pub session_cookie: Option<String>,
    pub session_max_age: Option<u64>,
    pub secure_cookies: Option<bool>,
    pub media_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Fully resolved configuration; immutable for the process lifetime
#[derive(Clone)]
pub struct Config {
    pub secret_key: String,
    pub password: String,
    pub session_cookie: String,
    pub session_max_age: u64,
    pub secure_cookies: bool,
    pub media_root: PathBuf,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret_key", &"<redacted>")
            .field("password", &"<redacted>")
            .field("session_cookie", &self.session_cookie)
            .field("session_max_age", &self.session_max_age)
            .field("secure_cookies", &self.secure_cookies)
            .field("media_root", &self.media_root)
            .field("data_dir", &self.data_dir)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Merge overrides over the file over compiled defaults, then validate
    pub fn resolve(overrides: ConfigOverrides, file: Option<TomlConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();
        let log_level = resolve_log_level(overrides.log_level.clone(), Some(&file));

        let secret_key = require_secret("EARMARK_SECRET_KEY", overrides.secret_key, MIN_SECRET_KEY_LEN)?;
        let password = require_secret("EARMARK_PASSWORD", overrides.password, MIN_PASSWORD_LEN)?;

        let session_cookie = overrides
            .session_cookie
            .or(file.session_cookie)
            .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());
        if session_cookie.trim().is_empty() {
            return Err(Error::Config("Session cookie name must not be empty".to_string()));
        }

        let session_max_age = overrides
            .session_max_age
            .or(file.session_max_age)
            .unwrap_or(DEFAULT_SESSION_MAX_AGE_SECS);
        if session_max_age == 0 {
            return Err(Error::Config("Session max age must be greater than zero".to_string()));
        }

        Ok(Self {
            secret_key,
            password,
            session_cookie,
            session_max_age,
            secure_cookies: overrides.secure_cookies.or(file.secure_cookies).unwrap_or(true),
            media_root: overrides
                .media_root
                .or(file.media_root)
                .unwrap_or_else(default_media_root),
            data_dir: overrides
                .data_dir
                .or(file.data_dir)
                .unwrap_or_else(default_data_dir),
            host: overrides
                .host
                .or(file.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            log_level,
        })
    }
}

fn require_secret(name: &str, value: Option<String>, min_length: usize) -> Result<String> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("Environment variable {} must be set.", name)))?;
    if value.chars().count() < min_length {
        return Err(Error::Config(format!(
            "Environment variable {} must be at least {} characters.",
            name, min_length
        )));
    }
    Ok(value)
}

/// Log filter directive by the same priority as every other setting
///
/// Split out so the binary can start tracing before the full configuration,
/// with its secrets, has been validated.
pub fn resolve_log_level(override_level: Option<String>, file: Option<&TomlConfig>) -> String {
    override_level
        .or_else(|| file.and_then(|f| f.logging.level.clone()))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Locate the TOML file: the explicit path if given, else the first existing
/// of `<config_dir>/earmark/config.toml` and `/etc/earmark/config.toml`
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let user_config = dirs::config_dir().map(|d| d.join("earmark").join("config.toml"));
    let system_config = PathBuf::from("/etc/earmark/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|path| path.exists())
}

/// Read and parse a TOML bootstrap file
pub fn load_config_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// OS-dependent default media root: the user's audio folder, else `./media`
pub fn default_media_root() -> PathBuf {
    dirs::audio_dir().unwrap_or_else(|| PathBuf::from("./media"))
}

/// OS-dependent default data directory for the progress file
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("earmark"))
        .unwrap_or_else(|| PathBuf::from("./earmark_data"))
}
