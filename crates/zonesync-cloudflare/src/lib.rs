//! # Cloudflare DNS Provider
//!
//! This crate provides the Cloudflare implementation of `DnsProvider`.
//!
//! ## Behaviour
//!
//! - ✅ One HTTP request per call (list = one GET, update = one PUT)
//! - ✅ Bearer-token authentication; the token never appears in logs
//! - ✅ List responses are validated: `success: false` is an error carrying
//!   the provider's messages verbatim
//! - ✅ Dry-run mode: updates are logged, not sent
//! - ⚠️ Update responses are NOT inspected unless `verify_updates` is set;
//!   a completed HTTP exchange counts as success
//! - ❌ NO retry, backoff or caching (owned by the Reconciler)
//! - ❌ NO pagination: only the first page of a zone is listed
//!
//! ## API Reference
//!
//! - Cloudflare API v4: <https://developers.cloudflare.com/api/>
//! - List DNS Records: GET `/zones/:zone_id/dns_records`
//! - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use zonesync_core::config::{CLOUDFLARE_API_BASE, ProviderConfig};
use zonesync_core::record::{DnsRecord, RecordBody};
use zonesync_core::traits::DnsProvider;
use zonesync_core::{Error, Result};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "cloudflare";

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    result: Option<T>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Join provider error messages for an error string
fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "provider returned no error details".to_string();
    }
    errors
        .iter()
        .map(|e| match e.code {
            Some(code) => format!("{} (code {})", e.message, code),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn provider_error(message: impl Into<String>) -> Error {
    Error::provider(PROVIDER_NAME, message)
}

/// Cloudflare DNS provider
///
/// Stateless apart from the HTTP client: record ids are never cached.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Decode update responses and fail on `success: false`
    verify_updates: bool,

    /// Dry-run mode: list normally but skip PUT updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("verify_updates", &self.verify_updates)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            verify_updates: false,
            dry_run: false,
        })
    }

    /// Create a provider from configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        match config {
            ProviderConfig::Cloudflare {
                api_token,
                api_base,
                verify_updates,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                Ok(Self::new(api_token.clone())?
                    .with_api_base(api_base.clone())
                    .with_verify_updates(*verify_updates)
                    .with_dry_run(*dry_run))
            }
        }
    }

    /// Point the provider at another API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Check the success flag of update responses
    pub fn with_verify_updates(mut self, verify_updates: bool) -> Self {
        self.verify_updates = verify_updates;
        self
    }

    /// Log updates instead of sending them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/zones/{}/dns_records/{}", self.api_base, zone_id, record_id)
    }

    /// Check an update response's envelope
    async fn verify_update_response(&self, record_id: &str, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            provider_error(format!("failed to read update response for {}: {}", record_id, e))
        })?;

        let envelope: ApiEnvelope<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| {
                provider_error(format!(
                    "failed to decode update response for {} (HTTP {}): {}",
                    record_id, status, e
                ))
            })?;

        if !status.is_success() || !envelope.success {
            return Err(provider_error(format!(
                "failed to update DNS record {} (HTTP {}): {}",
                record_id,
                status,
                describe(&envelope.errors)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// List the zone's DNS records
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records
    /// Authorization: Bearer <token>
    /// ```
    ///
    /// The body is decoded whatever the HTTP status; Cloudflare reports
    /// failures through `success` and `errors`.
    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Listing DNS records for zone {}", zone_id);

        let response = self
            .client
            .get(self.records_url(zone_id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| provider_error(format!("failed to list DNS records: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| provider_error(format!("failed to read DNS record list: {}", e)))?;

        let envelope: ApiEnvelope<Vec<DnsRecord>> = serde_json::from_str(&body).map_err(|e| {
            provider_error(format!(
                "failed to decode DNS records (HTTP {}): {}",
                status, e
            ))
        })?;

        if !envelope.success {
            return Err(provider_error(format!(
                "failed to list DNS records: {}",
                describe(&envelope.errors)
            )));
        }

        let records = envelope.result.unwrap_or_default();
        tracing::debug!("Found {} DNS record(s) in zone {}", records.len(), zone_id);
        Ok(records)
    }

    /// Replace a DNS record
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// Authorization: Bearer <token>
    ///
    /// { "name": "...", "ttl": 1, "type": "A", "content": "198.51.100.7", ... }
    /// ```
    async fn update_record(&self, zone_id: &str, record_id: &str, record: &RecordBody) -> Result<()> {
        let url = self.record_url(zone_id, record_id);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(record)?
            );
            return Ok(());
        }

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_token)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                provider_error(format!("failed to update DNS record {}: {}", record_id, e))
            })?;

        if self.verify_updates {
            return self.verify_update_response(record_id, response).await;
        }

        tracing::debug!(
            "Update of DNS record {} returned HTTP {}",
            record_id,
            response.status()
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
