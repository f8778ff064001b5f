//! Proxy candidate and probe verdict models

use serde::Deserialize;
use std::fmt;

/// An unverified SOCKS5 proxy endpoint from the discovery source.
///
/// Candidates are immutable once fetched; the optional country/ISP fields
/// are carried from the list endpoint and used as display fallbacks when
/// the geo lookup fails.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
}

impl Candidate {
    /// Create a candidate without metadata
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            country: None,
            isp: None,
        }
    }

    /// Get the candidate address in IP:PORT format
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Get the candidate as a socks5:// proxy URL
    pub fn socks_url(&self) -> String {
        format!("socks5://{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr())
    }
}

/// Why a candidate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The proxy endpoint could not be reached
    ConnectFailed,
    /// The TLS request through the proxy failed or returned a bad status
    ProbeRequestFailed,
    /// The round-trip latency could not be measured
    LatencyUnknown,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ConnectFailed => write!(f, "connect failed"),
            FailureReason::ProbeRequestFailed => write!(f, "probe request failed"),
            FailureReason::LatencyUnknown => write!(f, "latency unknown"),
        }
    }
}

/// Outcome of probing one candidate, produced exactly once per validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the candidate carried a TLS request end to end
    pub usable: bool,
    /// Measured average round-trip latency, if it could be determined
    pub latency_ms: Option<u64>,
    pub failure: Option<FailureReason>,
}

impl Verdict {
    /// A usable candidate with a measured latency
    pub fn working(latency_ms: u64) -> Self {
        Self {
            usable: true,
            latency_ms: Some(latency_ms),
            failure: None,
        }
    }

    /// A usable candidate whose latency could not be measured
    pub fn latency_unknown() -> Self {
        Self {
            usable: true,
            latency_ms: None,
            failure: Some(FailureReason::LatencyUnknown),
        }
    }

    /// A candidate that failed one of the probe steps
    pub fn failed(reason: FailureReason) -> Self {
        Self {
            usable: false,
            latency_ms: None,
            failure: Some(reason),
        }
    }

    /// Accept policy: usable, latency known and within the threshold
    pub fn accepted(&self, max_latency_ms: u64) -> bool {
        self.usable && self.latency_ms.is_some_and(|l| l <= max_latency_ms)
    }
}

/// A candidate paired with its accepted verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProxy {
    pub candidate: Candidate,
    pub latency_ms: u64,
}

impl ValidatedProxy {
    pub fn new(candidate: Candidate, latency_ms: u64) -> Self {
        Self {
            candidate,
            latency_ms,
        }
    }
}

impl fmt::Display for ValidatedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}ms)", self.candidate.addr(), self.latency_ms)
    }
}
