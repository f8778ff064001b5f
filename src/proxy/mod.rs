//! Proxy discovery and validation
//!
//! This module provides functionality for:
//! - Fetching proxy candidates from a remote list endpoint
//! - Probing each candidate for reachability, TLS support and latency
//! - Aggregating working proxies concurrently under a bounded fan-out
//! - Enriching display output with geo/ISP information

pub mod geo;
pub mod models;
pub mod probe;
pub mod source;
pub mod validator;

pub use geo::GeoClient;
pub use models::{Candidate, FailureReason, ValidatedProxy, Verdict};
pub use probe::{Probe, ProbeConfig, Prober};
pub use source::{CandidateSource, SourceConfig};
pub use validator::{Validator, ValidatorConfig};
