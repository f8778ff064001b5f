//! Geo/ISP enrichment for proxy display
//!
//! Looks up country and ISP for an address via an HTTP JSON endpoint.
//! Purely cosmetic: any failure falls back to the caller-supplied defaults
//! and never affects which proxies are accepted.

use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default geo lookup endpoint; the IP is appended to the path
pub const DEFAULT_GEO_URL: &str = "https://ipwhois.app/json/";

/// Default timeout for geo lookups in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    isp: Option<String>,
}

/// Client for the geo lookup endpoint
pub struct GeoClient {
    client: Client,
    base_url: String,
}

impl GeoClient {
    /// Create a client for the default endpoint
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_GEO_URL.to_string())
    }

    /// Create a client for a custom endpoint
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Look up country and ISP for an address, falling back to the given
    /// defaults when the endpoint is unreachable or returns junk.
    pub async fn lookup(
        &self,
        ip: &str,
        default_country: &str,
        default_isp: &str,
    ) -> (String, String) {
        match self.try_lookup(ip).await {
            Ok(geo) => (
                geo.country
                    .unwrap_or_else(|| default_country.to_string()),
                geo.isp.unwrap_or_else(|| default_isp.to_string()),
            ),
            Err(e) => {
                debug!(ip, error = %e, "geo lookup failed");
                (default_country.to_string(), default_isp.to_string())
            }
        }
    }

    async fn try_lookup(&self, ip: &str) -> Result<GeoResponse> {
        let url = format!("{}{}", self.base_url, ip);
        let response = self.client.get(&url).send().await?;
        Ok(response.json::<GeoResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/json/1.2.3.4")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"country": "Germany", "isp": "Example GmbH"}"#)
            .create_async()
            .await;

        let geo = GeoClient::with_base_url(format!("{}/json/", server.url())).unwrap();
        let (country, isp) = geo.lookup("1.2.3.4", "Unknown", "Unknown").await;

        assert_eq!(country, "Germany");
        assert_eq!(isp, "Example GmbH");
    }

    #[tokio::test]
    async fn test_lookup_partial_body_uses_defaults() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/json/1.2.3.4")
            .with_status(200)
            .with_body(r#"{"country": "Germany"}"#)
            .create_async()
            .await;

        let geo = GeoClient::with_base_url(format!("{}/json/", server.url())).unwrap();
        let (country, isp) = geo.lookup("1.2.3.4", "Unknown", "Fallback ISP").await;

        assert_eq!(country, "Germany");
        assert_eq!(isp, "Fallback ISP");
    }

    #[tokio::test]
    async fn test_lookup_malformed_body_uses_defaults() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/json/1.2.3.4")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let geo = GeoClient::with_base_url(format!("{}/json/", server.url())).unwrap();
        let (country, isp) = geo.lookup("1.2.3.4", "DefaultLand", "DefaultNet").await;

        assert_eq!(country, "DefaultLand");
        assert_eq!(isp, "DefaultNet");
    }

    #[tokio::test]
    async fn test_lookup_unreachable_endpoint_uses_defaults() {
        let geo = GeoClient::with_base_url("http://127.0.0.1:1/json/".to_string()).unwrap();
        let (country, isp) = geo.lookup("1.2.3.4", "A", "B").await;

        assert_eq!(country, "A");
        assert_eq!(isp, "B");
    }
}
