//! Capture configuration

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment-derived capture settings
///
/// Read from `CONSUL_*` variables: `CONSUL_HTTP_ADDR`, `CONSUL_HTTP_TOKEN`,
/// `CONSUL_PPROF_DURATION` and `CONSUL_PPROF_OUTPUT_ROOT`.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Agent address
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// ACL token sent as a bearer token
    #[serde(default)]
    pub http_token: Option<String>,

    /// CPU profile and trace window in seconds
    #[serde(default = "default_duration")]
    pub pprof_duration: u64,

    /// Directory in which the run directory is created
    #[serde(default = "default_output_root")]
    pub pprof_output_root: PathBuf,
}

fn default_http_addr() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_duration() -> u64 {
    30
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

impl CaptureConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(None)
    }

    /// Load configuration from an explicit variable map, or the process
    /// environment when `None`
    pub fn from_env(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CONSUL")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("Failed to read CONSUL_* environment")?;

        let capture: Self = config
            .try_deserialize()
            .context("Invalid CONSUL_* environment values")?;

        if capture.pprof_duration == 0 {
            bail!("CONSUL_PPROF_DURATION must be at least 1 second");
        }
        Ok(capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::from_env(Some(HashMap::new())).unwrap();
        assert_eq!(config.http_addr, "http://127.0.0.1:8500");
        assert_eq!(config.http_token, None);
        assert_eq!(config.pprof_duration, 30);
        assert_eq!(config.pprof_output_root, PathBuf::from("."));
    }

    #[test]
    fn test_consul_variables() {
        let config = CaptureConfig::from_env(Some(vars(&[
            ("CONSUL_HTTP_ADDR", "https://consul.example:8501"),
            ("CONSUL_HTTP_TOKEN", "abc-123"),
            ("CONSUL_PPROF_DURATION", "5"),
            ("CONSUL_CACERT", "/etc/consul/ca.pem"),
        ])))
        .unwrap();

        assert_eq!(config.http_addr, "https://consul.example:8501");
        assert_eq!(config.http_token.as_deref(), Some("abc-123"));
        assert_eq!(config.pprof_duration, 5);
    }

    #[test]
    fn test_invalid_duration() {
        let result = CaptureConfig::from_env(Some(vars(&[("CONSUL_PPROF_DURATION", "soon")])));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let err = CaptureConfig::from_env(Some(vars(&[("CONSUL_PPROF_DURATION", "0")])))
            .unwrap_err();
        assert!(err.to_string().contains("at least 1 second"));
    }
}
