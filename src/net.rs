use std::time::Duration;

use anyhow::{Context, Result};

pub const USER_AGENT: &str = concat!("medley/", env!("CARGO_PKG_VERSION"));

/// Shared client for extractor API calls.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("building HTTP client")
}

/// Client that surfaces redirects instead of following them, for extractors
/// that read Location headers to recanonicalize short links.
pub fn build_no_redirect_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("building no-redirect HTTP client")
}
