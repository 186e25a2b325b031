//! Core traits for zonesync
//!
//! These are the two collaborators the reconciler talks to.
//!
//! - [`IpDiscovery`]: Find the machine's current public IP address
//! - [`DnsProvider`]: List and update records in a provider zone

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::{IpDiscovery, IpVersion};
pub use dns_provider::DnsProvider;
