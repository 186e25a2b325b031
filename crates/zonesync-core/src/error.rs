//! Error types for zonesync
//!
//! Every failure the reconciler can hit maps onto one of these variants.
//! The reconciler never exits the process itself; it returns the error and
//! lets the caller decide.

use thiserror::Error;

/// Result type alias for zonesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for zonesync
#[derive(Error, Debug)]
pub enum Error {
    /// A required setting is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The public IP address could not be determined
    #[error("IP discovery error: {0}")]
    Discovery(String),

    /// A provider call failed (transport or provider-reported failure)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The zone returned no records at startup
    #[error("No DNS records found in zone {zone_id}")]
    NoRecords {
        /// Zone that was queried
        zone_id: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O errors (spawning helper programs and the like)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an IP discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a "no records" error for a zone
    pub fn no_records(zone_id: impl Into<String>) -> Self {
        Self::NoRecords {
            zone_id: zone_id.into(),
        }
    }

    /// Short name of the error class, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Discovery(_) => "discovery",
            Error::Provider { .. } => "provider",
            Error::NoRecords { .. } => "no_records",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
            Error::Other(_) => "other",
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_names_provider() {
        let err = Error::provider("cloudflare", "Invalid access token");
        assert_eq!(
            err.to_string(),
            "Provider error (cloudflare): Invalid access token"
        );
        assert_eq!(err.kind(), "provider");
    }

    #[test]
    fn no_records_mentions_zone() {
        let err = Error::no_records("zone-123");
        assert!(err.to_string().contains("zone-123"));
    }

    #[test]
    fn anyhow_errors_become_other() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Other(ref m) if m == "boom"));
    }
}
