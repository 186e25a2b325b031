// # IP Discovery Trait
//
// Defines the interface for finding the machine's current public IP address.
//
// ## Implementations
//
// - dig against an OpenDNS resolver: `zonesync-ip-dig` crate
// - plain-text HTTP echo service: `zonesync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::IpDiscovery;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpDiscovery implementation */;
//     let ip = source.current().await?;
//     println!("public IP: {ip}");
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    #[default]
    V4,
    V6,
}

impl IpVersion {
    /// DNS record type carrying addresses of this family
    pub fn record_type(self) -> &'static str {
        match self {
            IpVersion::V4 => "A",
            IpVersion::V6 => "AAAA",
        }
    }

    /// Whether an address belongs to this family
    pub fn matches(self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for IP discovery implementations
///
/// A discovery source answers one question, synchronously from the caller's
/// point of view: what is the public address right now. It does not cache,
/// poll or retry; the reconciler calls it once per cycle.
///
/// The address is returned as a string and written verbatim into record
/// content, so implementations should trim whatever their backend prints.
#[async_trait]
pub trait IpDiscovery: Send + Sync {
    /// Get the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The current address, trimmed
    /// - `Err(Error::Discovery)`: If the address could not be determined
    async fn current(&self) -> Result<String, crate::Error>;

    /// Get the IP version this source reports
    ///
    /// Returns `None` if the source does not restrict the family.
    fn family(&self) -> Option<IpVersion> {
        None
    }
}
