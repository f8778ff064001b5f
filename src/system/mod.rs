//! System proxy configuration and exit cleanup
//!
//! Applies or disables the SOCKS firewall proxy via `networksetup` for
//! each known network service. Disabling when nothing is applied is
//! harmless, and `CleanupGuard` makes sure the disable path runs at most
//! once per process no matter how many exit paths request it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Network services the proxy settings are written to
const NETWORK_SERVICES: &[&str] = &["Wi-Fi", "Ethernet"];

/// Host network configuration boundary.
///
/// Both operations swallow their own failures: a misconfigured service
/// list or a missing `networksetup` binary is reported but never aborts
/// the run.
#[async_trait]
pub trait SystemProxy: Send + Sync {
    /// Point the system SOCKS proxy at the given endpoint
    async fn apply(&self, ip: &str, port: u16);
    /// Turn the system SOCKS proxy off; harmless when nothing is applied
    async fn disable(&self);
}

/// `networksetup`-backed system proxy control
pub struct NetworkSetup;

impl NetworkSetup {
    pub fn new() -> Self {
        Self
    }

    async fn run_networksetup(args: &[&str]) {
        match Command::new("networksetup").args(args).status().await {
            Ok(status) if !status.success() => {
                debug!(?args, %status, "networksetup exited with failure");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(?args, error = %e, "failed to run networksetup");
            }
        }
    }
}

impl Default for NetworkSetup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemProxy for NetworkSetup {
    async fn apply(&self, ip: &str, port: u16) {
        let port_str = port.to_string();
        for &service in NETWORK_SERVICES {
            Self::run_networksetup(&["-setsocksfirewallproxy", service, ip, &port_str]).await;
        }
        info!(proxy = %format!("{ip}:{port}"), "system proxy applied");
    }

    async fn disable(&self) {
        for &service in NETWORK_SERVICES {
            Self::run_networksetup(&["-setsocksfirewallproxystate", service, "off"]).await;
        }
        info!("system proxy disabled");
    }
}

/// Runs the system proxy disable path at most once per process.
///
/// Both the interrupt handler and the normal exit flow funnel through
/// this guard, so the two can never race a duplicate disable.
pub struct CleanupGuard<S: SystemProxy> {
    system: Arc<S>,
    done: AtomicBool,
}

impl<S: SystemProxy> CleanupGuard<S> {
    pub fn new(system: Arc<S>) -> Self {
        Self {
            system,
            done: AtomicBool::new(false),
        }
    }

    /// Disable the system proxy if no other path has done so already
    pub async fn disable_once(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        self.system.disable().await;
    }
}
