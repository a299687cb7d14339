//! Affix Core Library
//!
//! This crate provides the domain model of the attachment pipeline: the
//! `Attachment` entity and its persisted record shape, the error taxonomy,
//! per-field and process-wide configuration, and the trait interfaces the
//! core consumes (storage drivers, content converters, host entities).
//!
//! Driver implementations live in `affix-storage`; converters and the
//! conversion pipeline in `affix-processing`; the lifecycle coordinator in
//! `affix`.

pub mod attachment;
pub mod config;
pub mod converter;
pub mod driver;
pub mod entity;
pub mod error;
pub mod record;

// Re-export commonly used types
pub use attachment::{Attachment, RawFile};
pub use config::{
    AttachmentConfig, AttachmentConfigBuilder, AttachmentOptions, BlurhashComponents,
    BlurhashPolicy, EncodeSpec, OutputFormat, RenameFn, RenamePolicy, ResizeFit, ResizeSpec,
    VariantRef, VariantSelection, VariantSpec,
};
pub use converter::{ConvertInput, ConvertOutput, Converter};
pub use driver::{ByteStream, StorageDriver, StorageError, StorageResult};
pub use entity::AttachmentHost;
pub use error::{AttachmentError, AttachmentResult};
pub use record::{AttachmentRecord, VariantRecord};
