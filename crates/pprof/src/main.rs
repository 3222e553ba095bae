//! consul-pprof - capture Go runtime profiles from a Consul agent
//!
//! Fetches heap, CPU, trace and goroutine profiles from the agent's debug
//! endpoints into a timestamped directory and reports which captures look
//! valid. Only an unreachable agent fails the run.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use diag_lib::output::{
    color_status, format_bytes, print_info, print_success, print_table, print_warning,
    OutputFormat,
};
use diag_lib::profile::{CaptureReport, ProfileCollector};
use diag_lib::{init_tracing, CaptureJob};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;
use tracing::info;

/// Capture Go runtime profiles from a Consul agent
#[derive(Parser)]
#[command(name = "consul-pprof")]
#[command(author, version, about = "Capture Go runtime profiles from a Consul agent", long_about = None)]
struct Cli {
    /// Agent address (defaults to CONSUL_HTTP_ADDR, then http://127.0.0.1:8500)
    address: Option<String>,

    /// CPU profile and trace window in seconds (defaults to CONSUL_PPROF_DURATION, then 30)
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    duration: Option<u64>,

    /// Directory in which the run directory is created
    #[arg(long)]
    output_root: Option<PathBuf>,

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

/// Row for the capture summary table
#[derive(Tabled, Serialize)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs, cli.verbose);

    let config = config::CaptureConfig::load()?;
    let address = cli.address.unwrap_or(config.http_addr);
    let duration = cli.duration.unwrap_or(config.pprof_duration);
    let output_root = cli.output_root.unwrap_or(config.pprof_output_root);

    let job = CaptureJob::new(address, config.http_token, duration, output_root);
    info!(address = %job.target_address, duration_secs = job.duration_secs, "Capture configured");

    print_info(&format!(
        "Capturing profiles from {} ({}s window)",
        job.target_address, job.duration_secs
    ));

    let collector = ProfileCollector::new(&job)?;
    let report = collector
        .collect(&job)
        .await
        .context("Profile capture aborted")?;

    print_summary(&report, cli.format);
    Ok(())
}

fn print_summary(report: &CaptureReport, format: OutputFormat) {
    match report.debug_enabled {
        Some(true) => print_info("Agent reports enable_debug = true"),
        Some(false) => print_info("Agent reports enable_debug = false"),
        None => print_info("Agent debug setting unknown"),
    }

    let rows: Vec<ProfileRow> = report
        .results
        .iter()
        .map(|r| ProfileRow {
            profile: r.kind.to_string(),
            file: r.file.clone(),
            size: format_bytes(r.size_bytes),
            status: match format {
                OutputFormat::Table => color_status(if r.passed { "passed" } else { "failed" }),
                OutputFormat::Json => (if r.passed { "passed" } else { "failed" }).to_string(),
            },
            reason: r.reason.clone().unwrap_or_default(),
        })
        .collect();
    print_table(&rows, format);

    for failed in report.failed() {
        print_warning(&format!(
            "{} is not usable: {}",
            failed.kind,
            failed.reason.as_deref().unwrap_or("unknown")
        ));
    }

    print_success(&format!(
        "{}/{} profiles captured in {}",
        report.passed_count(),
        report.results.len(),
        report.job.output_dir.display()
    ));
}
