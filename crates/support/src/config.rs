//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI configuration file contents
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Namespace used when `--namespace` is not given
    pub default_namespace: Option<String>,
    /// Kubernetes context used when `--context` is not given
    pub default_context: Option<String>,
    /// Directory in which run directories are created
    pub output_root: Option<PathBuf>,
    /// Name or path of the consul-k8s binary
    pub cli_binary: Option<String>,
}

impl Config {
    /// Load configuration from the given file, or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::config_path()?),
        }
    }

    /// Load configuration from a file; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".config")
            .join("consul-k8s-support")
            .join("config.json"))
    }
}
