//! Error types module
//!
//! This module provides the error taxonomy used throughout the attachment
//! pipeline. All domain errors are unified under the `AttachmentError` enum;
//! storage backends have their own `StorageError` (see [`crate::driver`])
//! which converts into `AttachmentError::Storage`.

use crate::driver::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    /// A read accessor was used before the attachment was processed and a
    /// storage driver was bound. This is a fail-fast contract: accessors
    /// never silently return an empty value.
    #[error("attachment is not processed, please flush the owning entity first")]
    NotProcessed,

    /// A named variant was requested through an accessor but the processed
    /// record holds no variant with that name.
    #[error("attachment has no variant \"{0}\"")]
    VariantNotFound(String),

    #[error("unknown attachment driver \"{0}\"")]
    UnknownDriver(String),

    /// A variant selection referenced a name absent from the global variant
    /// table.
    #[error("unknown attachment variant \"{0}\"")]
    UnknownVariant(String),

    /// A `:placeholder` in a folder template referenced an entity field that
    /// is absent or null. Fields computed only after the first flush (e.g.
    /// auto-incrementing primary keys) are unsafe to reference in templates.
    #[error("missing value for attachment path \"{field}\" in entity {entity}; ensure the referenced property is computed before the attachment is processed (auto-incrementing fields are not supported)")]
    MissingPlaceholderValue { field: String, entity: String },

    /// The persisted column value could not be deserialized into a record.
    #[error("invalid attachment data: {0}")]
    InvalidAttachmentData(String),

    /// A converter, upload or hash step failed while processing one field.
    /// During pre-commit this aborts the enclosing flush.
    #[error("failed to process attachment \"{field}\"")]
    ProcessingFailed {
        field: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AttachmentError {
    /// Wrap `self` as a processing failure for `field`, unless it already
    /// is one. Used at the pre-commit boundary so the host sees a single
    /// "attachment processing failed" error per field.
    pub fn into_processing_failed(self, field: &str) -> AttachmentError {
        match self {
            failed @ AttachmentError::ProcessingFailed { .. } => failed,
            other => AttachmentError::ProcessingFailed {
                field: field.to_string(),
                source: anyhow::Error::new(other),
            },
        }
    }
}

/// Result type for attachment operations
pub type AttachmentResult<T> = Result<T, AttachmentError>;
