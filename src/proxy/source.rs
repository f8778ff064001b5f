//! Candidate discovery from a remote proxy list endpoint
//!
//! The list endpoint serves a JSON array of `{ip, port, country, isp}`
//! objects. Bodies are parsed tolerantly: malformed JSON falls back to
//! plain-text IP:PORT extraction, and an empty or unparseable body yields
//! an empty candidate set rather than an error.

use crate::proxy::models::Candidate;
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Default proxy list endpoint (free SOCKS5 proxies)
pub const DEFAULT_LIST_URL: &str =
    "https://raw.githubusercontent.com/proxifly/free-proxy-list/refs/heads/main/proxies/protocols/socks5/data.json";

/// Default timeout for the list request in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Regex pattern to match IP:PORT pairs in non-JSON bodies
static IP_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5})\b")
        .expect("Invalid IP:PORT regex")
});

/// Configuration for the candidate source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// URL of the proxy list endpoint
    pub url: String,
    /// Timeout for the list request
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LIST_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Fetches proxy candidates from the configured list endpoint
pub struct CandidateSource {
    config: SourceConfig,
    client: Client,
}

impl CandidateSource {
    /// Create a new source with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(SourceConfig::default())
    }

    /// Create a new source with custom configuration
    pub fn with_config(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, client })
    }

    /// Fetch the candidate list.
    ///
    /// Transport errors surface as `Err`; callers treat a failed fetch the
    /// same as an empty list. Body-level problems never fail the call.
    pub async fn fetch(&self) -> Result<Vec<Candidate>> {
        let response = self.client.get(&self.config.url).send().await?;
        let body = response.text().await?;
        Ok(Self::parse_body(&body))
    }

    /// Parse a list body, falling back to IP:PORT extraction for
    /// anything that is not a JSON candidate array.
    pub fn parse_body(body: &str) -> Vec<Candidate> {
        match serde_json::from_str::<Vec<Candidate>>(body) {
            Ok(candidates) => candidates
                .into_iter()
                .filter(|c| c.port != 0)
                .collect(),
            Err(e) => {
                if !body.trim().is_empty() {
                    warn!(error = %e, "proxy list is not a JSON array, trying plain-text extraction");
                }
                Self::extract_with_regex(body)
            }
        }
    }

    /// Extract candidates using regex pattern matching
    fn extract_with_regex(body: &str) -> Vec<Candidate> {
        IP_PORT_REGEX
            .captures_iter(body)
            .filter_map(|cap| {
                let ip = cap.get(1)?.as_str().to_string();
                let port: u16 = cap.get(2)?.as_str().parse().ok()?;

                // Validate IP address parts
                let parts: Vec<&str> = ip.split('.').collect();
                if parts.len() != 4 {
                    return None;
                }
                for part in parts {
                    let num: u32 = part.parse().ok()?;
                    if num > 255 {
                        return None;
                    }
                }

                if port == 0 {
                    return None;
                }

                Some(Candidate::new(ip, port))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_default() {
        let config = SourceConfig::default();
        assert_eq!(config.url, DEFAULT_LIST_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_source_config_builder() {
        let config = SourceConfig::new()
            .with_url("http://example.com/list.json".to_string())
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("Custom Agent".to_string());

        assert_eq!(config.url, "http://example.com/list.json");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "Custom Agent");
    }

    #[test]
    fn test_parse_json_array() {
        let body = r#"[
            {"ip": "1.2.3.4", "port": 1080, "country": "US", "isp": "A"},
            {"ip": "5.6.7.8", "port": 4145}
        ]"#;
        let candidates = CandidateSource::parse_body(body);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].addr(), "1.2.3.4:1080");
        assert_eq!(candidates[0].country, Some("US".to_string()));
        assert_eq!(candidates[1].addr(), "5.6.7.8:4145");
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(CandidateSource::parse_body("").is_empty());
        assert!(CandidateSource::parse_body("   \n").is_empty());
    }

    #[test]
    fn test_parse_json_empty_array() {
        assert!(CandidateSource::parse_body("[]").is_empty());
    }

    #[test]
    fn test_parse_zero_port_filtered() {
        let body = r#"[{"ip": "1.2.3.4", "port": 0}]"#;
        assert!(CandidateSource::parse_body(body).is_empty());
    }

    #[test]
    fn test_parse_plain_text_fallback() {
        let body = "1.2.3.4:1080\nnot a proxy\n5.6.7.8:4145";
        let candidates = CandidateSource::parse_body(body);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].addr(), "1.2.3.4:1080");
    }

    #[test]
    fn test_extract_invalid_octets_rejected() {
        let body = "999.999.999.999:8080";
        assert!(CandidateSource::parse_body(body).is_empty());
    }

    #[test]
    fn test_extract_zero_port_rejected() {
        let body = "1.2.3.4:0";
        assert!(CandidateSource::parse_body(body).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_json_list() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/list.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"ip": "1.2.3.4", "port": 1080, "country": "US", "isp": "A"}]"#)
            .create_async()
            .await;

        let source = CandidateSource::with_config(
            SourceConfig::new().with_url(format!("{}/list.json", server.url())),
        )
        .unwrap();

        let candidates = source.fetch().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].addr(), "1.2.3.4:1080");
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/list.json")
            .with_status(200)
            .with_body("<html>1.2.3.4:1080</html>")
            .create_async()
            .await;

        let source = CandidateSource::with_config(
            SourceConfig::new().with_url(format!("{}/list.json", server.url())),
        )
        .unwrap();

        let candidates = source.fetch().await.unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_endpoint_errors() {
        let source = CandidateSource::with_config(
            SourceConfig::new()
                .with_url("http://127.0.0.1:1/list.json".to_string())
                .with_timeout(Duration::from_secs(1)),
        )
        .unwrap();

        assert!(source.fetch().await.is_err());
    }
}
