use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use proxypick::menu::Selector;
use proxypick::proxy::{
    geo::{self, GeoClient},
    probe::{self, ProbeConfig, Prober},
    source::{self, CandidateSource, SourceConfig},
    validator::{Validator, ValidatorConfig},
};
use proxypick::system::{CleanupGuard, NetworkSetup};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Finds working SOCKS5 proxies and switches the system proxy to one of them
#[derive(Parser)]
#[command(name = "proxypick")]
#[command(about = "Finds working SOCKS5 proxies and switches the system proxy")]
struct Cli {
    /// URL of the proxy list endpoint
    #[arg(long, default_value = source::DEFAULT_LIST_URL)]
    list_url: String,

    /// URL requested through each candidate to verify TLS support
    #[arg(long, default_value = probe::DEFAULT_TEST_URL)]
    test_url: String,

    /// Geo lookup endpoint used for display enrichment
    #[arg(long, default_value = geo::DEFAULT_GEO_URL)]
    geo_url: String,

    /// Maximum average ping for a proxy to be accepted, in milliseconds
    #[arg(long, default_value_t = 200)]
    max_ping: u64,

    /// Number of candidates probed concurrently
    #[arg(short = 'n', long, default_value_t = 50)]
    concurrency: usize,

    /// Timeout for reaching a proxy endpoint, in seconds
    #[arg(long, default_value_t = 5)]
    connect_timeout: u64,

    /// Timeout for the TLS request through a proxy, in seconds
    #[arg(long, default_value_t = 10)]
    request_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "proxypick=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let system = Arc::new(NetworkSetup::new());
    let cleanup = CleanupGuard::new(Arc::clone(&system));

    // The interrupt wins from any state: during validation, display or
    // with a proxy applied. Outstanding probes are not awaited.
    tokio::select! {
        result = run(&cli, Arc::clone(&system)) => result?,
        _ = signal::ctrl_c() => {
            println!();
            info!("interrupt received, shutting down");
        }
    }

    cleanup.disable_once().await;
    Ok(())
}

async fn run(cli: &Cli, system: Arc<NetworkSetup>) -> Result<()> {
    let source =
        CandidateSource::with_config(SourceConfig::new().with_url(cli.list_url.clone()))?;

    // A failed fetch is the same as an empty list
    let candidates = match source.fetch().await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(error = %e, "failed to fetch the proxy list");
            Vec::new()
        }
    };
    info!(count = candidates.len(), "fetched proxy candidates");

    let prober = Prober::with_config(
        ProbeConfig::new()
            .with_test_url(cli.test_url.clone())
            .with_connect_timeout(Duration::from_secs(cli.connect_timeout))
            .with_request_timeout(Duration::from_secs(cli.request_timeout)),
    );
    let validator = Validator::with_config(
        Arc::new(prober),
        ValidatorConfig::new()
            .with_max_latency_ms(cli.max_ping)
            .with_concurrency(cli.concurrency),
    );

    let proxies = validator.validate(candidates).await;

    if proxies.is_empty() {
        println!("{}", "No usable proxies found".yellow().bold());
        return Ok(());
    }

    let geo = GeoClient::with_base_url(cli.geo_url.clone())?;
    let mut selector = Selector::new(proxies, geo, system);
    selector.run().await
}
