//! # zonesync-core
//!
//! Core library for keeping a DNS zone's address records pointed at the
//! machine's current public IP.
//!
//! ## Architecture Overview
//!
//! - **IpDiscovery**: Trait for finding the current public IP
//! - **DnsProvider**: Trait for listing and updating records in a zone
//! - **Reconciler**: Drives the discover → list → diff → update cycle and
//!   schedules it until shutdown
//! - **SelectionPolicy**: Which record names the operator opted into
//! - **DnsRecord / RecordBody**: The one record schema shared by every mode
//!
//! ## Design Principles
//!
//! 1. **Stateless**: Records are re-listed every cycle; nothing is persisted
//! 2. **No hidden globals**: Configuration is built once and passed in
//! 3. **Errors are returned, not acted on**: The caller owns the exit decision
//! 4. **Library-First**: All reconciliation logic is usable without the daemon

pub mod traits;
pub mod engine;
pub mod record;
pub mod selection;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpDiscovery, DnsProvider, IpVersion};
pub use engine::{Reconciler, EngineEvent, CycleReport, Decision};
pub use record::{DnsRecord, RecordBody, RecordSettings, RecordMetadata};
pub use selection::SelectionPolicy;
pub use config::{ReconcilerConfig, ProviderConfig, FailureMode};
pub use error::{Error, Result};
