//! consul-k8s-support - gather Consul service-mesh proxy diagnostics
//!
//! Installs the `consul-k8s` CLI if needed, lists the proxies of a
//! namespace, captures status, stats, logs and upstream troubleshooting for
//! each matching proxy, and archives the result.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use diag_lib::bootstrap::Bootstrapper;
use diag_lib::output::{
    color_status, print_info, print_success, print_table, print_warning, OutputFormat,
};
use diag_lib::proxy::{GatherOutcome, SupportCollector, DEFAULT_CLI};
use diag_lib::runner::{CommandRunner, SystemRunner};
use diag_lib::{init_tracing, GatherJob};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;
use tracing::info;

/// Consul on Kubernetes support bundle collector
#[derive(Parser)]
#[command(name = "consul-k8s-support")]
#[command(author, version, about = "Collect Consul service-mesh proxy diagnostics from Kubernetes", long_about = None)]
struct Cli {
    /// Kubernetes namespace of the proxies (default: "default")
    #[arg(long, short)]
    namespace: Option<String>,

    /// Kubernetes context to use
    #[arg(long, short)]
    context: Option<String>,

    /// Only collect proxies whose name contains this value
    #[arg(long, short)]
    service: Option<String>,

    /// Directory in which the run directory is created
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Configuration file (default: ~/.config/consul-k8s-support/config.json)
    #[arg(long, env = "CONSUL_K8S_SUPPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Summary format
    #[arg(long, short, default_value = "table")]
    format: OutputFormat,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

/// Row for the collected proxies table
#[derive(Tabled, Serialize)]
struct ProxyRow {
    #[tabled(rename = "Proxy")]
    name: String,
    #[tabled(rename = "Type")]
    proxy_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Failed Commands")]
    failed: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs, cli.verbose);

    let config = config::Config::load(cli.config.as_deref())?;

    let namespace = cli
        .namespace
        .or(config.default_namespace)
        .unwrap_or_else(|| "default".to_string());
    let context = cli.context.or(config.default_context);
    let output_root = cli
        .output_root
        .or(config.output_root)
        .unwrap_or_else(|| PathBuf::from("."));
    let tool = config.cli_binary.unwrap_or_else(|| DEFAULT_CLI.to_string());

    let job = GatherJob::new(namespace, context, cli.service, output_root);
    info!(
        namespace = %job.namespace,
        context = job.context.as_deref().unwrap_or("current"),
        service_filter = job.service_filter.as_deref().unwrap_or(""),
        tool = %tool,
        "Gather configured"
    );
    print_info(&format!(
        "Collecting proxy diagnostics from namespace '{}'",
        job.namespace
    ));

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let bootstrapper = Bootstrapper::for_host(runner.clone());
    let collector = SupportCollector::new(runner, bootstrapper).with_tool(tool);

    let outcome = collector
        .gather(&job)
        .await
        .context("Diagnostics collection aborted")?;

    print_summary(&outcome, cli.format);
    Ok(())
}

fn print_summary(outcome: &GatherOutcome, format: OutputFormat) {
    if outcome.is_empty() {
        let filter = outcome
            .job
            .service_filter
            .as_deref()
            .map(|s| format!(" matching '{}'", s))
            .unwrap_or_default();
        print_warning(&format!(
            "No proxies{} found in namespace '{}' ({} listed), no archive created",
            filter, outcome.job.namespace, outcome.listed
        ));
        print_info(&format!(
            "Cluster status and proxy listing kept in {}",
            outcome.job.output_dir.display()
        ));
        return;
    }

    let rows: Vec<ProxyRow> = outcome
        .collected
        .iter()
        .map(|bundle| {
            let status = if bundle.failed.is_empty() {
                "collected"
            } else {
                "partial"
            };
            ProxyRow {
                name: bundle.record.name.clone(),
                proxy_type: bundle.record.proxy_type.clone(),
                status: match format {
                    OutputFormat::Table => color_status(status),
                    OutputFormat::Json => status.to_string(),
                },
                failed: bundle.failed.len().to_string(),
            }
        })
        .collect();
    print_table(&rows, format);

    if let Some(archive) = &outcome.archive {
        print_success(&format!(
            "Collected {} of {} proxies into {}",
            outcome.collected.len(),
            outcome.listed,
            archive.display()
        ));
    }
}
