//! # earmark common library
//!
//! Core of the earmark audio browser, free of any HTTP framework types:
//! - Path confinement onto the media root
//! - Durable per-file playback progress store
//! - Session authentication and CSRF token handling
//! - Directory catalog with played-state annotation
//! - Configuration loading and error types

pub mod catalog;
pub mod config;
pub mod error;
pub mod paths;
pub mod progress;
pub mod session;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use paths::{ConfinedPath, MediaRoot};
pub use progress::{ProgressRecord, ProgressStore};
pub use session::Session;
