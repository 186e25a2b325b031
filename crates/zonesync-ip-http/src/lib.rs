//! # HTTP IP Source
//!
//! Fetches the public IP from a plain-text "what is my IP" service such as
//! <https://api.ipify.org>, <https://ifconfig.me/ip> or <https://icanhazip.com>.
//!
//! ## Behaviour
//!
//! - One GET per `current()` call, nothing is cached between cycles
//! - Non-2xx responses are errors
//! - The trimmed body must parse as an IP address (of the configured family,
//!   when one is set)
//!
//! Useful where `dig` is not installed, and in CI.

use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use zonesync_core::traits::{IpDiscovery, IpVersion};
use zonesync_core::{Error, Result};

/// Service used when none is configured
pub const DEFAULT_URL: &str = "https://api.ipify.org";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based IP discovery
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// Only accept addresses of this family
    family: Option<IpVersion>,

    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source for the given URL
    ///
    /// # Errors
    ///
    /// `Error::Config` if the URL is empty or the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::config("IP service URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url,
            family: None,
            client,
        })
    }

    pub fn with_family(mut self, family: IpVersion) -> Self {
        self.family = Some(family);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn parse_body(&self, body: &str) -> Result<String> {
        let text = body.trim();
        let ip: IpAddr = text.parse().map_err(|_| {
            Error::discovery(format!("{} returned an invalid address: {:?}", self.url, text))
        })?;

        match self.family {
            Some(family) if !family.matches(&ip) => Err(Error::discovery(format!(
                "Expected {}, got: {}",
                family, ip
            ))),
            _ => Ok(text.to_string()),
        }
    }
}

#[async_trait]
impl IpDiscovery for HttpIpSource {
    async fn current(&self) -> Result<String> {
        tracing::debug!("Fetching public IP from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::discovery(format!("HTTP request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::discovery(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::discovery(format!("Failed to read response body: {}", e)))?;

        self.parse_body(&body)
    }

    fn family(&self) -> Option<IpVersion> {
        self.family
    }
}
