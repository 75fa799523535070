//! Command-line arguments
//!
//! Every flag can also be supplied through its `EARMARK_*` environment variable.
//! Unset flags fall through to the TOML file and then to compiled defaults.

use clap::builder::BoolishValueParser;
use clap::Parser;
use earmark_common::config::ConfigOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "earmark")]
#[command(about = "Password-protected web browser and player for a local audio library")]
#[command(version)]
pub struct Args {
    /// Secret used to sign session cookies (at least 32 characters)
    #[arg(long, env = "EARMARK_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Access password (at least 8 characters)
    #[arg(long, env = "EARMARK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Name of the session cookie
    #[arg(long, env = "EARMARK_SESSION_COOKIE")]
    pub session_cookie: Option<String>,

    /// Session lifetime in seconds
    #[arg(long, env = "EARMARK_SESSION_MAX_AGE", value_name = "SECONDS")]
    pub session_max_age: Option<u64>,

    /// Mark the session cookie Secure (disable only for plain-HTTP development)
    #[arg(
        long,
        env = "EARMARK_SECURE_COOKIES",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub secure_cookies: Option<bool>,

    /// Directory tree to serve
    #[arg(long, env = "EARMARK_MEDIA_ROOT", value_name = "DIR")]
    pub media_root: Option<PathBuf>,

    /// Directory holding progress.json
    #[arg(long, env = "EARMARK_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "EARMARK_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "EARMARK_PORT")]
    pub port: Option<u16>,

    /// Explicit TOML config file
    #[arg(short, long, env = "EARMARK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" or "earmark_web=debug,tower_http=info"
    #[arg(long, env = "EARMARK_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    /// Settings that outrank the TOML file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            secret_key: self.secret_key.clone(),
            password: self.password.clone(),
            session_cookie: self.session_cookie.clone(),
            session_max_age: self.session_max_age,
            secure_cookies: self.secure_cookies,
            media_root: self.media_root.clone(),
            data_dir: self.data_dir.clone(),
            host: self.host.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
        }
    }
}
