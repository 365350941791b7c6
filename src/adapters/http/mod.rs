//! HTTP adapters for the hosted backend (REST data endpoint and token refresh).

pub mod auth;
pub mod endpoint;

pub use auth::HttpAuthProvider;
pub use endpoint::HttpRemoteEndpoint;

use anyhow::{Context, Result};
use reqwest::Client as ReqwestClient;
use std::time::Duration;

/// Shared client builder so both adapters get the same timeout and pooling.
pub(crate) fn build_client(timeout_secs: u64) -> Result<ReqwestClient> {
    ReqwestClient::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(10)
        .tcp_nodelay(true)
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
