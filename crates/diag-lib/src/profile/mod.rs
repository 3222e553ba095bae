//! Runtime profile capture from a Consul agent
//!
//! Fetches the Go pprof endpoints one at a time, keeps every response on
//! disk, and reports which artifacts look usable.

mod client;
mod collector;
mod validate;

pub use client::{
    extract_debug_enabled, normalize_address, AgentClient, AgentResponse, RetryPolicy,
    CONNECT_TIMEOUT, FETCH_GRACE, PROBE_TIMEOUT,
};
pub use collector::{fetch_timeout, CaptureReport, ProfileCollector, REPORT_FILE};
pub use validate::{compute_checksum, scan_for_markers, validate_profile, FAILURE_MARKERS};
