//! Single-candidate probing
//!
//! A probe runs three bounded steps in order: a TCP reachability check
//! against the proxy endpoint, a TLS request through the proxy to a fixed
//! test URL, and a ping-based latency measurement. Each step has its own
//! timeout and a failed step maps to one `FailureReason`.

use crate::proxy::models::{Candidate, FailureReason, Verdict};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::debug;

/// Default URL requested through each candidate to verify TLS support
pub const DEFAULT_TEST_URL: &str = "https://www.google.com";

/// Default timeout for reaching the proxy endpoint in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default timeout for the TLS request in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default timeout for the latency measurement in seconds
const DEFAULT_PING_TIMEOUT_SECS: u64 = 10;

/// Number of echo requests sent per latency measurement
const PING_COUNT: u32 = 4;

/// Determines usability and latency of one candidate.
///
/// Implementations must not mutate shared state; a probe is called
/// concurrently for many candidates at once.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, candidate: &Candidate) -> Verdict;
}

/// Configuration for the network prober
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// URL requested through the proxy
    pub test_url: String,
    /// Timeout for reaching the proxy endpoint
    pub connect_timeout: Duration,
    /// Timeout for the TLS request through the proxy
    pub request_timeout: Duration,
    /// Timeout for the ping latency measurement
    pub ping_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            test_url: DEFAULT_TEST_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            ping_timeout: Duration::from_secs(DEFAULT_PING_TIMEOUT_SECS),
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }
}

/// Network prober checking SOCKS5 candidates against the real endpoints
pub struct Prober {
    config: ProbeConfig,
}

impl Prober {
    /// Create a new prober with default configuration
    pub fn new() -> Self {
        Self::with_config(ProbeConfig::default())
    }

    /// Create a new prober with custom configuration
    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Build a client that tunnels through the candidate.
    ///
    /// Certificate verification is relaxed: the check is whether the proxy
    /// can carry TLS traffic at all, not whether the chain verifies.
    fn create_client(&self, candidate: &Candidate) -> Result<Client> {
        let proxy = ReqwestProxy::all(candidate.socks_url())?;

        let client = Client::builder()
            .proxy(proxy)
            .danger_accept_invalid_certs(true)
            .timeout(self.config.request_timeout)
            .build()?;

        Ok(client)
    }

    /// Measure the average round-trip latency to an address with the
    /// system ping, returning `None` when it cannot be determined.
    async fn measure_latency(&self, ip: &str) -> Option<u64> {
        let output = tokio::time::timeout(
            self.config.ping_timeout,
            Command::new("ping")
                .arg("-c")
                .arg(PING_COUNT.to_string())
                .arg(ip)
                .output(),
        )
        .await
        .ok()?
        .ok()?;

        if !output.status.success() {
            return None;
        }

        parse_ping_average(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for Prober {
    async fn probe(&self, candidate: &Candidate) -> Verdict {
        // Step 1: can the proxy endpoint be reached at all?
        let connect = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(candidate.addr()),
        )
        .await;

        match connect {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(proxy = %candidate.addr(), error = %e, "connect failed");
                return Verdict::failed(FailureReason::ConnectFailed);
            }
            Err(_) => {
                debug!(proxy = %candidate.addr(), "connect timed out");
                return Verdict::failed(FailureReason::ConnectFailed);
            }
        }

        // Step 2: TLS request through the proxy
        let client = match self.create_client(candidate) {
            Ok(client) => client,
            Err(e) => {
                debug!(proxy = %candidate.addr(), error = %e, "client build failed");
                return Verdict::failed(FailureReason::ProbeRequestFailed);
            }
        };

        match client.get(&self.config.test_url).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                debug!(proxy = %candidate.addr(), status = %response.status(), "probe request rejected");
                return Verdict::failed(FailureReason::ProbeRequestFailed);
            }
            Err(e) => {
                debug!(proxy = %candidate.addr(), error = %e, "probe request failed");
                return Verdict::failed(FailureReason::ProbeRequestFailed);
            }
        }

        // Step 3: independent latency measurement
        match self.measure_latency(&candidate.ip).await {
            Some(latency_ms) => Verdict::working(latency_ms),
            None => Verdict::latency_unknown(),
        }
    }
}

/// Parse the average round trip from a ping summary line.
///
/// Both the Linux (`rtt min/avg/max/mdev = ...`) and macOS
/// (`round-trip min/avg/max/stddev = ...`) formats split on `/` into the
/// same positions.
fn parse_ping_average(output: &str) -> Option<u64> {
    for line in output.lines() {
        if !line.contains("avg") {
            continue;
        }
        let parts: Vec<&str> = line.split('/').collect();
        if parts.len() >= 5 {
            if let Ok(avg) = parts[4].trim().parse::<f64>() {
                return Some(avg.round() as u64);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_config_default() {
        let config = ProbeConfig::default();
        assert_eq!(config.test_url, DEFAULT_TEST_URL);
        assert_eq!(
            config.connect_timeout,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        );
        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_probe_config_builder() {
        let config = ProbeConfig::new()
            .with_test_url("https://example.com".to_string())
            .with_connect_timeout(Duration::from_secs(2))
            .with_request_timeout(Duration::from_secs(4))
            .with_ping_timeout(Duration::from_secs(6));

        assert_eq!(config.test_url, "https://example.com");
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(4));
        assert_eq!(config.ping_timeout, Duration::from_secs(6));
    }

    #[test]
    fn test_parse_ping_average_linux() {
        let output = "4 packets transmitted, 4 received, 0% packet loss, time 3004ms\n\
                      rtt min/avg/max/mdev = 10.123/20.567/30.901/5.432 ms";
        assert_eq!(parse_ping_average(output), Some(21));
    }

    #[test]
    fn test_parse_ping_average_macos() {
        let output = "4 packets transmitted, 4 packets received, 0.0% packet loss\n\
                      round-trip min/avg/max/stddev = 23.242/25.158/27.033/1.548 ms";
        assert_eq!(parse_ping_average(output), Some(25));
    }

    #[test]
    fn test_parse_ping_average_garbage() {
        assert_eq!(parse_ping_average("no summary here"), None);
        assert_eq!(parse_ping_average(""), None);
        assert_eq!(parse_ping_average("min/avg = 1"), None);
    }

    #[tokio::test]
    async fn test_probe_unreachable_candidate() {
        let prober = Prober::with_config(
            ProbeConfig::new().with_connect_timeout(Duration::from_secs(1)),
        );
        // Port 1 on loopback is refused immediately
        let candidate = Candidate::new("127.0.0.1", 1);
        let verdict = prober.probe(&candidate).await;

        assert!(!verdict.usable);
        assert_eq!(verdict.failure, Some(FailureReason::ConnectFailed));
        assert!(verdict.latency_ms.is_none());
    }
}
