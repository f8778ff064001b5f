//! Concurrent candidate validation
//!
//! Fans out one probe per candidate under a bounded concurrency cap and
//! collects accepted candidates into a mutex-guarded result set. The call
//! only returns after every probe has resolved, so callers never observe
//! a partial set; the returned `Vec` is the frozen result.

use crate::proxy::models::{Candidate, ValidatedProxy};
use crate::proxy::probe::Probe;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

/// Default maximum average latency for an accepted proxy, in milliseconds
const DEFAULT_MAX_LATENCY_MS: u64 = 200;

/// Default number of concurrent probes
const DEFAULT_CONCURRENCY: usize = 50;

/// Configuration for the validator
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Latency threshold above which usable candidates are still rejected
    pub max_latency_ms: u64,
    /// Number of concurrent probes
    pub concurrency: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_latency_ms: DEFAULT_MAX_LATENCY_MS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_latency_ms(mut self, max_latency_ms: u64) -> Self {
        self.max_latency_ms = max_latency_ms;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Validates candidates by probing them concurrently
pub struct Validator<P: Probe> {
    probe: Arc<P>,
    config: ValidatorConfig,
}

impl<P: Probe + 'static> Validator<P> {
    /// Create a validator with default configuration
    pub fn new(probe: Arc<P>) -> Self {
        Self::with_config(probe, ValidatorConfig::default())
    }

    /// Create a validator with custom configuration
    pub fn with_config(probe: Arc<P>, config: ValidatorConfig) -> Self {
        Self { probe, config }
    }

    /// Probe every candidate and return the accepted set.
    ///
    /// Entries are appended in completion order, which is nondeterministic
    /// across runs. Rejections are logged and never retried; an empty or
    /// all-rejected input yields an empty set, not an error.
    pub async fn validate(&self, candidates: Vec<Candidate>) -> Vec<ValidatedProxy> {
        let accepted: Arc<Mutex<Vec<ValidatedProxy>>> = Arc::new(Mutex::new(Vec::new()));
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let max_latency_ms = self.config.max_latency_ms;

        stream::iter(candidates)
            .map(|candidate| {
                let probe = Arc::clone(&self.probe);
                let sem = Arc::clone(&semaphore);
                let accepted = Arc::clone(&accepted);
                async move {
                    // Semaphore acquire only fails if the semaphore is closed,
                    // which won't happen here since we own the Arc and keep it
                    // alive for the duration of the validation pass.
                    let _permit = sem
                        .acquire()
                        .await
                        .expect("Semaphore closed unexpectedly");

                    let verdict = probe.probe(&candidate).await;

                    match verdict.latency_ms {
                        Some(latency_ms) if verdict.accepted(max_latency_ms) => {
                            info!(proxy = %candidate.addr(), latency_ms, "proxy accepted");
                            accepted
                                .lock()
                                .await
                                .push(ValidatedProxy::new(candidate, latency_ms));
                        }
                        _ => match (verdict.failure, verdict.latency_ms) {
                            (Some(reason), _) => {
                                warn!(proxy = %candidate.addr(), %reason, "proxy rejected");
                            }
                            (None, Some(latency_ms)) => {
                                warn!(proxy = %candidate.addr(), latency_ms, "proxy rejected: latency above threshold");
                            }
                            (None, None) => {
                                warn!(proxy = %candidate.addr(), "proxy rejected");
                            }
                        },
                    }
                }
            })
            .buffer_unordered(self.config.concurrency)
            .collect::<Vec<()>>()
            .await;

        // Every worker has completed, so this is the sole reference
        Arc::try_unwrap(accepted)
            .expect("all probe tasks joined")
            .into_inner()
    }
}
