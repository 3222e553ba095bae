//! Proxy diagnostics gathering pipeline

use super::commands::{ConsulK8s, DEFAULT_CLI};
use super::listing::{matches_filter, parse_proxy_listing};
use crate::archive::create_tar_gz_async;
use crate::bootstrap::Bootstrapper;
use crate::error::Result;
use crate::models::{create_run_dir, GatherJob, ProxyArtifact, ProxyRecord};
use crate::observability::StructuredLogger;
use crate::runner::{capture_to_file, CommandRunner};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Cluster-wide status output
pub const STATUS_FILE: &str = "status.txt";

/// Raw proxy listing output
pub const PROXY_LIST_FILE: &str = "proxy_list.txt";

/// One collected per-proxy bundle
#[derive(Debug, Clone, Serialize)]
pub struct ProxyBundle {
    #[serde(flatten)]
    pub record: ProxyRecord,
    pub dir: PathBuf,
    /// Artifacts whose command exited with failure
    pub failed: Vec<ProxyArtifact>,
}

/// Result of a gathering run
#[derive(Debug, Clone, Serialize)]
pub struct GatherOutcome {
    pub job: GatherJob,
    /// Rows found in the listing before filtering
    pub listed: usize,
    /// Bundles in listing order
    pub collected: Vec<ProxyBundle>,
    /// `None` when no proxy matched
    pub archive: Option<PathBuf>,
}

impl GatherOutcome {
    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }
}

/// Collects diagnostics for every matching proxy of a namespace
pub struct SupportCollector {
    runner: Arc<dyn CommandRunner>,
    bootstrapper: Bootstrapper,
    tool: String,
}

impl SupportCollector {
    pub fn new(runner: Arc<dyn CommandRunner>, bootstrapper: Bootstrapper) -> Self {
        Self {
            runner,
            bootstrapper,
            tool: DEFAULT_CLI.to_string(),
        }
    }

    /// Use a different CLI binary name or path
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Run the gathering pipeline
    ///
    /// Only bootstrap and local I/O failures are fatal. Subcommand failures
    /// are captured in their artifact files.
    pub async fn gather(&self, job: &GatherJob) -> Result<GatherOutcome> {
        let program = self.bootstrapper.ensure(&self.tool).await?;
        let program = program.to_string_lossy().into_owned();
        let cli = ConsulK8s::new(program, &job.namespace, job.context.clone());

        let logger = StructuredLogger::new("consul-k8s-support", &job.timestamp);

        create_run_dir(&job.output_dir)?;
        logger.log_gather_started(
            &job.namespace,
            job.context.as_deref(),
            job.service_filter.as_deref(),
            &job.output_dir,
        );

        let runner = self.runner.as_ref();
        capture_to_file(runner, cli.program(), &cli.status(), &job.output_dir.join(STATUS_FILE))
            .await?;

        let list_path = job.output_dir.join(PROXY_LIST_FILE);
        capture_to_file(runner, cli.program(), &cli.proxy_list(), &list_path).await?;
        let listing = tokio::fs::read(&list_path).await?;
        let listing = String::from_utf8_lossy(&listing);

        let mut listed = 0;
        let mut collected = Vec::new();

        for record in parse_proxy_listing(&listing) {
            listed += 1;
            if !matches_filter(&record, job.service_filter.as_deref()) {
                debug!(proxy = %record.name, "Proxy does not match filter, skipping");
                continue;
            }

            let bundle = self.collect_proxy(&cli, job, record).await?;
            logger.log_proxy_collected(
                &bundle.record.name,
                &bundle.record.proxy_type,
                bundle.failed.len(),
            );
            collected.push(bundle);
        }

        if collected.is_empty() {
            info!(
                namespace = %job.namespace,
                listed = listed,
                service_filter = ?job.service_filter,
                "No proxies matched, skipping archive"
            );
            logger.log_run_finished(0, 0);
            return Ok(GatherOutcome {
                job: job.clone(),
                listed,
                collected,
                archive: None,
            });
        }

        let archive = create_tar_gz_async(job.output_dir.clone()).await?;
        let size = tokio::fs::metadata(&archive).await?.len();
        logger.log_archive_created(&archive, size);

        let failed = collected.iter().filter(|b| !b.failed.is_empty()).count();
        logger.log_run_finished(collected.len() - failed, failed);

        Ok(GatherOutcome {
            job: job.clone(),
            listed,
            collected,
            archive: Some(archive),
        })
    }

    async fn collect_proxy(
        &self,
        cli: &ConsulK8s,
        job: &GatherJob,
        record: ProxyRecord,
    ) -> Result<ProxyBundle> {
        let dir = job.output_dir.join(&record.name);
        tokio::fs::create_dir_all(&dir).await?;
        info!(proxy = %record.name, proxy_type = %record.proxy_type, "Collecting proxy diagnostics");

        let mut failed = Vec::new();
        for artifact in ProxyArtifact::ALL {
            let args = cli.artifact(artifact, &record.name);
            let path = dir.join(artifact.file_name());
            if !capture_to_file(self.runner.as_ref(), cli.program(), &args, &path).await? {
                failed.push(artifact);
            }
        }

        Ok(ProxyBundle {
            record,
            dir,
            failed,
        })
    }
}
