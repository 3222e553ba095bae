//! Error taxonomy for the collectors
//!
//! Only fatal, environment-level failures are represented here. Per-profile
//! and per-command failures are recorded in results and artifact files.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a collection run
#[derive(Debug, Error)]
pub enum DiagError {
    /// The target agent did not answer the status probe
    #[error("Consul agent at {address} is unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    /// The configured agent address could not be parsed
    #[error("invalid agent address '{0}'")]
    InvalidAddress(String),

    /// No installation strategy exists for this host
    #[error("unsupported platform '{0}': install the required CLI manually")]
    UnsupportedPlatform(String),

    /// A required CLI could not be installed
    #[error("failed to install {tool}: {reason}")]
    InstallFailed { tool: String, reason: String },

    /// Run directories are never reused
    #[error("output directory {} already exists", .0.display())]
    OutputExists(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DiagError>;
