//! DNS record schema
//!
//! One schema is shared by every mode of the daemon. A [`DnsRecord`] is what
//! the provider returns from a list call; a [`RecordBody`] is the writable part
//! that goes back on an update. Updates always resend the full body because the
//! provider's update endpoint replaces the whole resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The writable representation of a DNS record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBody {
    /// Fully-qualified record name
    pub name: String,

    /// Time-to-live (1 means "automatic" for Cloudflare)
    #[serde(default)]
    pub ttl: u32,

    /// Record type tag ("A", "AAAA", "CNAME", ...)
    #[serde(rename = "type")]
    pub record_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Record value; the only field the reconciler ever changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RecordSettings>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl RecordBody {
    /// Create a minimal body with a name, type and content
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ttl: 1,
            record_type: record_type.into(),
            comment: None,
            content: Some(content.into()),
            proxied: None,
            settings: None,
            tags: Vec::new(),
        }
    }
}

/// Provider-specific record settings
///
/// Keys this crate does not know about are kept in `extra` and written back
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_only: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_only: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Read-only response metadata; never sent back on writes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_modified_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_modified_on: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxiable: Option<bool>,

    /// Opaque provider metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// A DNS record as held by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned identifier, the update target key
    pub id: String,

    #[serde(flatten)]
    pub body: RecordBody,

    #[serde(flatten)]
    pub metadata: RecordMetadata,
}

impl DnsRecord {
    /// Create a record with empty metadata
    pub fn new(id: impl Into<String>, body: RecordBody) -> Self {
        Self {
            id: id.into(),
            body,
            metadata: RecordMetadata::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.body.name
    }

    pub fn record_type(&self) -> &str {
        &self.body.record_type
    }

    pub fn content(&self) -> Option<&str> {
        self.body.content.as_deref()
    }

    /// Build the update payload: the fetched body with `content` replaced
    pub fn with_content(&self, content: impl Into<String>) -> RecordBody {
        RecordBody {
            content: Some(content.into()),
            ..self.body.clone()
        }
    }
}
