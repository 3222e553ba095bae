//! Core data models for the collectors

use crate::error::{DiagError, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Format used for run directory timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Prefix of ProfileCollector run directories
pub const PPROF_DIR_PREFIX: &str = "consul-pprof";

/// Prefix of ProxyDiagnosticsCollector run directories
pub const SUPPORT_DIR_PREFIX: &str = "consul_k8s_support";

/// Current local time in run directory format
pub fn run_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Create a fresh run directory, refusing to reuse an existing one
pub fn create_run_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match std::fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(DiagError::OutputExists(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// A single profile capture run against one agent
#[derive(Debug, Clone, Serialize)]
pub struct CaptureJob {
    pub target_address: String,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub duration_secs: u64,
    pub output_dir: PathBuf,
    pub timestamp: String,
}

impl CaptureJob {
    /// Create a job stamped with the current time
    pub fn new(
        target_address: impl Into<String>,
        auth_token: Option<String>,
        duration_secs: u64,
        output_root: impl AsRef<Path>,
    ) -> Self {
        Self::with_timestamp(
            target_address,
            auth_token,
            duration_secs,
            output_root,
            run_timestamp(),
        )
    }

    /// Create a job with an explicit timestamp
    pub fn with_timestamp(
        target_address: impl Into<String>,
        auth_token: Option<String>,
        duration_secs: u64,
        output_root: impl AsRef<Path>,
        timestamp: impl Into<String>,
    ) -> Self {
        let timestamp = timestamp.into();
        let output_dir = output_root
            .as_ref()
            .join(format!("{}-{}", PPROF_DIR_PREFIX, timestamp));

        Self {
            target_address: target_address.into(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
            duration_secs,
            output_dir,
            timestamp,
        }
    }

    /// The ordered profile requests for this job
    pub fn requests(&self) -> Vec<ProfileRequest> {
        ProfileRequest::all(self.duration_secs)
    }
}

/// Kinds of runtime profile exposed by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileKind {
    Heap,
    CpuProfile,
    Trace,
    Goroutine,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Heap => "heap",
            ProfileKind::CpuProfile => "cpu-profile",
            ProfileKind::Trace => "trace",
            ProfileKind::Goroutine => "goroutine",
        }
    }

    /// Whether the endpoint blocks for the capture duration
    pub fn is_windowed(&self) -> bool {
        matches!(self, ProfileKind::CpuProfile | ProfileKind::Trace)
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One debug endpoint to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRequest {
    pub kind: ProfileKind,
    pub url_path: String,
    pub output_filename: &'static str,
}

impl ProfileRequest {
    /// The fixed, ordered set: heap, cpu-profile, trace, goroutine
    pub fn all(duration_secs: u64) -> Vec<ProfileRequest> {
        vec![
            ProfileRequest {
                kind: ProfileKind::Heap,
                url_path: "/debug/pprof/heap".to_string(),
                output_filename: "heap.prof",
            },
            ProfileRequest {
                kind: ProfileKind::CpuProfile,
                url_path: format!("/debug/pprof/profile?seconds={}", duration_secs),
                output_filename: "profile.prof",
            },
            ProfileRequest {
                kind: ProfileKind::Trace,
                url_path: format!("/debug/pprof/trace?seconds={}", duration_secs),
                output_filename: "trace.out",
            },
            ProfileRequest {
                kind: ProfileKind::Goroutine,
                url_path: "/debug/pprof/goroutine".to_string(),
                output_filename: "goroutine.prof",
            },
        ]
    }
}

/// Outcome of fetching and checking one profile
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub kind: ProfileKind,
    pub file: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ValidationResult {
    /// A profile that could not be fetched at all
    pub fn fetch_failed(request: &ProfileRequest, reason: impl Into<String>) -> Self {
        Self {
            kind: request.kind,
            file: request.output_filename.to_string(),
            passed: false,
            reason: Some(reason.into()),
            http_status: None,
            size_bytes: 0,
            sha256: None,
        }
    }
}

/// A single proxy diagnostics gathering run
#[derive(Debug, Clone, Serialize)]
pub struct GatherJob {
    pub namespace: String,
    pub context: Option<String>,
    pub service_filter: Option<String>,
    pub output_dir: PathBuf,
    pub timestamp: String,
}

impl GatherJob {
    /// Create a job stamped with the current time
    pub fn new(
        namespace: impl Into<String>,
        context: Option<String>,
        service_filter: Option<String>,
        output_root: impl AsRef<Path>,
    ) -> Self {
        Self::with_timestamp(namespace, context, service_filter, output_root, run_timestamp())
    }

    /// Create a job with an explicit timestamp
    pub fn with_timestamp(
        namespace: impl Into<String>,
        context: Option<String>,
        service_filter: Option<String>,
        output_root: impl AsRef<Path>,
        timestamp: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let timestamp = timestamp.into();
        let output_dir = output_root.as_ref().join(format!(
            "{}_{}_{}",
            SUPPORT_DIR_PREFIX, namespace, timestamp
        ));

        Self {
            namespace,
            context: context.filter(|c| !c.is_empty()),
            service_filter: service_filter.filter(|s| !s.is_empty()),
            output_dir,
            timestamp,
        }
    }
}

/// A proxy row from `consul-k8s proxy list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub proxy_type: String,
}

/// Files written into each per-proxy bundle, in collection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyArtifact {
    StatusTable,
    StatusJson,
    StatusRaw,
    Stats,
    LogLevels,
    UpstreamTroubleshoot,
}

impl ProxyArtifact {
    pub const ALL: [ProxyArtifact; 6] = [
        ProxyArtifact::StatusTable,
        ProxyArtifact::StatusJson,
        ProxyArtifact::StatusRaw,
        ProxyArtifact::Stats,
        ProxyArtifact::LogLevels,
        ProxyArtifact::UpstreamTroubleshoot,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ProxyArtifact::StatusTable => "proxy_read_table.txt",
            ProxyArtifact::StatusJson => "proxy_read.json",
            ProxyArtifact::StatusRaw => "proxy_read_raw.json",
            ProxyArtifact::Stats => "proxy_stats.txt",
            ProxyArtifact::LogLevels => "proxy_log_levels.txt",
            ProxyArtifact::UpstreamTroubleshoot => "troubleshoot_upstreams.txt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_profile_requests_are_ordered() {
        let kinds: Vec<ProfileKind> = ProfileRequest::all(5).iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ProfileKind::Heap,
                ProfileKind::CpuProfile,
                ProfileKind::Trace,
                ProfileKind::Goroutine
            ]
        );
    }

    #[test]
    fn test_profile_requests_carry_duration() {
        let requests = ProfileRequest::all(42);
        assert_eq!(requests[1].url_path, "/debug/pprof/profile?seconds=42");
        assert_eq!(requests[2].url_path, "/debug/pprof/trace?seconds=42");
        assert_eq!(requests[0].url_path, "/debug/pprof/heap");
    }

    #[test]
    fn test_capture_job_directory_name() {
        let job = CaptureJob::with_timestamp(
            "http://localhost:8500",
            Some(String::new()),
            5,
            "/tmp/out",
            "20240101_120000",
        );
        assert_eq!(
            job.output_dir,
            PathBuf::from("/tmp/out/consul-pprof-20240101_120000")
        );
        assert!(job.auth_token.is_none());
    }

    #[test]
    fn test_gather_job_directory_name() {
        let job = GatherJob::with_timestamp(
            "default",
            None,
            Some(String::new()),
            ".",
            "20240101_120000",
        );
        assert_eq!(
            job.output_dir,
            PathBuf::from("./consul_k8s_support_default_20240101_120000")
        );
        assert!(job.service_filter.is_none());
    }

    #[test]
    fn test_capture_job_report_omits_token() {
        let job = CaptureJob::with_timestamp("http://a", Some("secret".into()), 5, ".", "ts");
        let json = serde_json::to_string(&job).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_create_run_dir_refuses_existing() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("run");

        create_run_dir(&dir).unwrap();
        assert!(dir.is_dir());

        let err = create_run_dir(&dir).unwrap_err();
        assert!(matches!(err, DiagError::OutputExists(_)));
    }

    #[test]
    fn test_artifact_file_names_are_unique() {
        let mut names: Vec<&str> = ProxyArtifact::ALL.iter().map(|a| a.file_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}
