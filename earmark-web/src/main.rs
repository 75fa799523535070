//! earmark - authenticated web browser and player for a local audio library
//!
//! Startup order: arguments, config file, tracing, config validation, media root,
//! progress store, then the HTTP server. Invalid secrets abort startup.

use anyhow::{Context, Result};
use clap::Parser;
use earmark_common::config::{find_config_file, load_config_file, resolve_log_level, Config};
use earmark_common::{Catalog, MediaRoot, ProgressStore};
use earmark_web::cli::Args;
use earmark_web::{build_router, AppState};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The file may carry the log level, so it is read before tracing starts;
    // problems with it are reported once the subscriber is up
    let config_path = find_config_file(args.config.as_deref());
    let file_result = config_path.as_deref().map(load_config_file);
    let file_config = file_result.as_ref().and_then(|r| r.as_ref().ok()).cloned();

    init_tracing(&resolve_log_level(args.log_level.clone(), file_config.as_ref()));

    info!(
        "Starting earmark v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match (&config_path, &file_result) {
        (Some(path), Some(Ok(_))) => info!("Loaded config file {}", path.display()),
        (_, Some(Err(e))) => warn!("Ignoring config file: {}", e),
        _ => info!("No config file found, using flags, environment and defaults"),
    }

    let config = match Config::resolve(args.overrides(), file_config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!("Configuration: {:?}", config);

    if !config.secure_cookies {
        warn!("Secure cookies disabled: session cookie will be sent over plain HTTP");
    }

    let media_root = MediaRoot::open(&config.media_root)
        .with_context(|| format!("Failed to open media root {}", config.media_root.display()))?;
    info!("Media root: {}", media_root.path().display());

    let progress = ProgressStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open data dir {}", config.data_dir.display()))?;
    info!("Progress file: {}", progress.path().display());

    let state = AppState::new(&config, Catalog::new(media_root, Arc::new(progress)));
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("earmark listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("earmark stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
