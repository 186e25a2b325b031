//! Configuration types for zonesync
//!
//! Configuration is built once at startup and handed to constructors; nothing
//! here is mutated afterwards.

use crate::selection::SelectionPolicy;
use crate::traits::IpVersion;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between reconciliation cycles (30 minutes)
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Zone whose records are reconciled
    pub zone_id: String,

    /// Record names eligible for updates (empty = all)
    #[serde(default)]
    pub selection: SelectionPolicy,

    /// Address family whose record type is managed
    #[serde(default)]
    pub family: IpVersion,

    /// Time between cycles
    #[serde(default = "default_interval", with = "duration_secs")]
    pub interval: Duration,

    /// What a failed record update does to the rest of the cycle
    #[serde(default)]
    pub failure_mode: FailureMode,

    /// Capacity of the engine event channel
    ///
    /// When full, events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ReconcilerConfig {
    /// Create a configuration for a zone with defaults for everything else
    pub fn new(zone_id: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            selection: SelectionPolicy::all(),
            family: IpVersion::default(),
            interval: DEFAULT_INTERVAL,
            failure_mode: FailureMode::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_family(mut self, family: IpVersion) -> Self {
        self.family = family;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }
        if self.interval.is_zero() {
            return Err(crate::Error::config("Reconcile interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

/// How a failed record update affects the remaining records of a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// The first failure aborts the cycle and is fatal
    #[default]
    Strict,
    /// Failures are collected per record and the cycle carries on
    Isolated,
}

/// DNS provider configuration
///
/// Debug output never includes the API token.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// API base URL
        #[serde(default = "default_api_base")]
        api_base: String,
        /// Check the success flag of update responses
        #[serde(default)]
        verify_updates: bool,
        /// Log updates instead of sending them
        #[serde(default)]
        dry_run: bool,
    },
}

impl ProviderConfig {
    /// Cloudflare configuration with default endpoint and behaviour
    pub fn cloudflare(api_token: impl Into<String>) -> Self {
        ProviderConfig::Cloudflare {
            api_token: api_token.into(),
            api_base: default_api_base(),
            verify_updates: false,
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                api_base,
                ..
            } => {
                if api_token.trim().is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if !api_base.starts_with("https://") && !api_base.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Cloudflare API base must be an HTTP(S) URL. Got: {}",
                        api_base
                    )));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                api_base,
                verify_updates,
                dry_run,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("api_base", api_base)
                .field("verify_updates", verify_updates)
                .field("dry_run", dry_run)
                .finish(),
        }
    }
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_api_base() -> String {
    CLOUDFLARE_API_BASE.to_string()
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
