//! Proxy discovery and per-proxy diagnostics collection
//!
//! Drives the `consul-k8s` CLI: lists the proxies in a namespace, then
//! captures a fixed battery of read/stats/log/troubleshoot output for each
//! proxy that matches the service filter.

mod collector;
mod commands;
mod listing;

pub use collector::{GatherOutcome, ProxyBundle, SupportCollector, PROXY_LIST_FILE, STATUS_FILE};
pub use commands::{ConsulK8s, DEFAULT_CLI};
pub use listing::{matches_filter, parse_proxy_listing, ProxyListing};
