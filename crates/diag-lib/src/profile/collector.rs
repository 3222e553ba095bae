//! Profile capture pipeline

use super::client::{extract_debug_enabled, AgentClient, FETCH_GRACE};
use super::validate::validate_profile;
use crate::error::Result;
use crate::models::{create_run_dir, CaptureJob, ProfileRequest, ValidationResult};
use crate::observability::StructuredLogger;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Name of the report written next to the profiles
pub const REPORT_FILE: &str = "validation_report.json";

/// Result of a completed capture run
#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    pub job: CaptureJob,
    /// Advisory only; capture proceeds regardless
    pub debug_enabled: Option<bool>,
    pub results: Vec<ValidationResult>,
    #[serde(skip)]
    pub report_path: PathBuf,
}

impl CaptureReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Fetches and validates the four runtime profiles of one agent
pub struct ProfileCollector {
    client: AgentClient,
    logger: StructuredLogger,
}

impl ProfileCollector {
    /// Create a collector for the job's target
    pub fn new(job: &CaptureJob) -> Result<Self> {
        let client = AgentClient::new(&job.target_address, job.auth_token.clone())?;
        let logger = StructuredLogger::new("consul-pprof", &job.timestamp);
        Ok(Self::with_client(client, logger))
    }

    pub fn with_client(client: AgentClient, logger: StructuredLogger) -> Self {
        Self { client, logger }
    }

    /// Run the capture
    ///
    /// Only the reachability preflight and local I/O are fatal. Every
    /// profile is attempted; failures are recorded in the report.
    pub async fn collect(&self, job: &CaptureJob) -> Result<CaptureReport> {
        self.client.probe().await?;
        info!(address = %self.client.base_url(), "Agent reachable");

        let debug_enabled = match self.client.agent_self().await {
            Ok(body) => extract_debug_enabled(&body),
            Err(e) => {
                warn!(error = %e, "Could not read agent self-description");
                None
            }
        };
        self.logger.log_debug_flag(debug_enabled);

        create_run_dir(&job.output_dir)?;
        self.logger
            .log_capture_started(&job.target_address, job.duration_secs, &job.output_dir);

        let timeout = fetch_timeout(job.duration_secs);
        let mut results = Vec::with_capacity(4);

        for request in job.requests() {
            let result = self.capture_one(job, &request, timeout).await?;
            results.push(result);
        }

        let report = CaptureReport {
            job: job.clone(),
            debug_enabled,
            results,
            report_path: job.output_dir.join(REPORT_FILE),
        };

        let json = serde_json::to_vec_pretty(&report)?;
        tokio::fs::write(&report.report_path, json).await?;

        let passed = report.passed_count();
        self.logger
            .log_run_finished(passed, report.results.len() - passed);

        Ok(report)
    }

    async fn capture_one(
        &self,
        job: &CaptureJob,
        request: &ProfileRequest,
        timeout: Duration,
    ) -> Result<ValidationResult> {
        if request.kind.is_windowed() {
            info!(
                kind = %request.kind,
                duration_secs = job.duration_secs,
                "Capturing windowed profile, this blocks for the capture duration"
            );
        }

        let response = match self.client.fetch(&request.url_path, timeout).await {
            Ok(response) => response,
            Err(e) => {
                let reason = format!("fetch failed: {}", e);
                self.logger.log_profile_failed(request.kind, &e.to_string());
                return Ok(ValidationResult::fetch_failed(request, reason));
            }
        };

        let path = job.output_dir.join(request.output_filename);
        tokio::fs::write(&path, &response.body).await?;

        let result = validate_profile(request, &path, response.status).await?;
        self.logger.log_profile_captured(
            request.kind,
            result.size_bytes,
            result.passed,
            result.reason.as_deref(),
        );

        Ok(result)
    }
}

/// Total timeout for one profile fetch: the capture window plus a grace period
pub fn fetch_timeout(duration_secs: u64) -> Duration {
    Duration::from_secs(duration_secs).saturating_add(FETCH_GRACE)
}
