//! Observability infrastructure for the collectors
//!
//! Provides:
//! - Tracing subscriber setup (human-readable or JSON, always on stderr)
//! - Structured events for run milestones

use crate::models::ProfileKind;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the verbosity flag. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_tracing(json: bool, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}

/// Structured logger for collection run events
///
/// Every event carries the tool name and run timestamp so that logs from
/// several runs can be told apart.
#[derive(Clone)]
pub struct StructuredLogger {
    tool: String,
    run: String,
}

impl StructuredLogger {
    pub fn new(tool: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            run: run.into(),
        }
    }

    /// Log the start of a profile capture
    pub fn log_capture_started(&self, address: &str, duration_secs: u64, output_dir: &Path) {
        info!(
            event = "capture_started",
            tool = %self.tool,
            run = %self.run,
            address = %address,
            duration_secs = duration_secs,
            output_dir = %output_dir.display(),
            "Starting profile capture"
        );
    }

    /// Log the agent-reported debug flag (advisory only)
    pub fn log_debug_flag(&self, enabled: Option<bool>) {
        let value = match enabled {
            Some(true) => "true",
            Some(false) => "false",
            None => "unknown",
        };
        info!(
            event = "debug_flag",
            tool = %self.tool,
            run = %self.run,
            enable_debug = %value,
            "Agent debug endpoints setting"
        );
    }

    /// Log a fetched and validated profile
    pub fn log_profile_captured(
        &self,
        kind: ProfileKind,
        size_bytes: u64,
        passed: bool,
        reason: Option<&str>,
    ) {
        if passed {
            info!(
                event = "profile_captured",
                tool = %self.tool,
                run = %self.run,
                kind = %kind,
                size_bytes = size_bytes,
                "Profile captured"
            );
        } else {
            warn!(
                event = "profile_invalid",
                tool = %self.tool,
                run = %self.run,
                kind = %kind,
                size_bytes = size_bytes,
                reason = reason.unwrap_or("unknown"),
                "Profile failed validation, kept on disk for inspection"
            );
        }
    }

    /// Log a profile that could not be fetched
    pub fn log_profile_failed(&self, kind: ProfileKind, error: &str) {
        warn!(
            event = "profile_failed",
            tool = %self.tool,
            run = %self.run,
            kind = %kind,
            error = %error,
            "Profile fetch failed, continuing with next profile"
        );
    }

    /// Log the start of a proxy diagnostics run
    pub fn log_gather_started(
        &self,
        namespace: &str,
        context: Option<&str>,
        filter: Option<&str>,
        output_dir: &Path,
    ) {
        info!(
            event = "gather_started",
            tool = %self.tool,
            run = %self.run,
            namespace = %namespace,
            context = ?context,
            service_filter = ?filter,
            output_dir = %output_dir.display(),
            "Starting proxy diagnostics collection"
        );
    }

    /// Log the end of one proxy's bundle
    pub fn log_proxy_collected(&self, name: &str, proxy_type: &str, failed_commands: usize) {
        if failed_commands == 0 {
            info!(
                event = "proxy_collected",
                tool = %self.tool,
                run = %self.run,
                proxy = %name,
                proxy_type = %proxy_type,
                "Collected proxy diagnostics"
            );
        } else {
            warn!(
                event = "proxy_collected",
                tool = %self.tool,
                run = %self.run,
                proxy = %name,
                proxy_type = %proxy_type,
                failed_commands = failed_commands,
                "Collected proxy diagnostics with failures, see artifact files"
            );
        }
    }

    /// Log a written archive
    pub fn log_archive_created(&self, path: &Path, size_bytes: u64) {
        info!(
            event = "archive_created",
            tool = %self.tool,
            run = %self.run,
            path = %path.display(),
            size_bytes = size_bytes,
            "Archive created"
        );
    }

    /// Log run completion
    pub fn log_run_finished(&self, succeeded: usize, failed: usize) {
        info!(
            event = "run_finished",
            tool = %self.tool,
            run = %self.run,
            succeeded = succeeded,
            failed = failed,
            "Collection run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("consul-pprof", "20240101_120000");
        assert_eq!(logger.tool, "consul-pprof");
        assert_eq!(logger.run, "20240101_120000");
    }

    #[test]
    fn test_init_tracing_is_repeatable() {
        init_tracing(false, false);
        init_tracing(true, true);
    }
}
