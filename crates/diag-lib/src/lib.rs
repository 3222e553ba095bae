//! Diagnostic collection library for Consul service-mesh deployments
//!
//! This crate provides the core functionality for:
//! - Capturing Go runtime profiles from a Consul agent's debug API
//! - Discovering mesh proxies and collecting per-proxy diagnostics
//! - Bootstrapping the `consul-k8s` CLI dependency
//! - Archiving collected output and reporting progress

pub mod archive;
pub mod bootstrap;
pub mod error;
pub mod models;
pub mod observability;
pub mod output;
pub mod profile;
pub mod proxy;
pub mod runner;

pub use error::{DiagError, Result};
pub use models::*;
pub use observability::{init_tracing, StructuredLogger};
