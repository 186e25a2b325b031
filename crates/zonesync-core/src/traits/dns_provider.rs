// # DNS Provider Trait
//
// Defines the interface to the remote DNS provider.
//
// ## Implementations
//
// - Cloudflare: `zonesync-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for record in provider.list_records("zone-id").await? {
//         let body = record.with_content("198.51.100.7");
//         provider.update_record("zone-id", &record.id, &body).await?;
//     }
//
//     Ok(())
// }
// ```

use crate::record::{DnsRecord, RecordBody};
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// Providers hide authentication, request construction and response
/// decoding. They make no decisions: whether a record needs an update, and
/// what happens when a call fails, is owned by the `Reconciler`.
///
/// # Forbidden
/// - Retry or backoff (a failed call is returned as an error)
/// - Caching records between calls (ids must come from the latest list)
/// - Spawning tasks
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List the records of a zone
    ///
    /// Only the first page the provider returns is considered.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: Records in provider order
    /// - `Err(Error::Provider)`: Transport failure, undecodable response, or
    ///   a provider-reported failure (messages included verbatim)
    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Replace a record's full representation
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Zone holding the record
    /// - `record_id`: Id obtained from a list call in the same cycle
    /// - `record`: The complete body to store
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordBody,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
