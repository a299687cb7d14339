//! Persisted record shape
//!
//! `AttachmentRecord` is the JSON value written to the database column for a
//! processed attachment. The wire format is camelCase:
//!
//! ```json
//! {"drive": "...", "name": "...", "extname": "...", "size": 0,
//!  "mimeType": "...", "path": "...", "originalName": "...",
//!  "url": "...", "blurhash": "...",
//!  "variants": [{"name": "...", "extname": "...", "size": 0,
//!                "mimeType": "...", "path": "..."}]}
//! ```
//!
//! Deserialization is lenient: both a JSON string and an already-parsed
//! object are accepted, anything else is `InvalidAttachmentData`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AttachmentError, AttachmentResult};

/// One stored variant of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    pub name: String,
    pub extname: String,
    pub size: u64,
    pub mime_type: String,
    pub path: String,
}

/// Metadata describing a processed attachment: the stored original plus its
/// variants. This is what `Attachment::serialize` hands to the persistence
/// layer and what `Attachment::from_record` hydrates from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    /// Drive name the object was written through.
    pub drive: String,
    /// Logical object name (without extension).
    pub name: String,
    pub extname: String,
    pub size: u64,
    pub mime_type: String,
    /// Storage key of the original object.
    pub path: String,
    /// Client-supplied file name, kept verbatim for display.
    pub original_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blurhash: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantRecord>,
}

impl AttachmentRecord {
    /// Deserialize a database column value. Accepts a JSON string or an
    /// already-parsed object.
    pub fn from_column_value(value: &JsonValue) -> AttachmentResult<Self> {
        match value {
            JsonValue::String(raw) => serde_json::from_str(raw)
                .map_err(|e| AttachmentError::InvalidAttachmentData(e.to_string())),
            JsonValue::Object(_) => serde_json::from_value(value.clone())
                .map_err(|e| AttachmentError::InvalidAttachmentData(e.to_string())),
            other => Err(AttachmentError::InvalidAttachmentData(format!(
                "expected a JSON object or string, got {other}"
            ))),
        }
    }

    /// Serialize to the object form written to the database column.
    pub fn to_column_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Look up a variant by name.
    pub fn variant(&self, name: &str) -> Option<&VariantRecord> {
        self.variants.iter().find(|v| v.name == name)
    }
}
