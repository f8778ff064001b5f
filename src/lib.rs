//! Proxypick - SOCKS5 Proxy Finder and Switcher
//!
//! Fetches proxy candidates from a public list, validates them
//! concurrently (TLS usability through the proxy plus ping latency) and
//! lets the user apply one of the working proxies to the system network
//! configuration.

pub mod menu;
pub mod proxy;
pub mod system;

pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
