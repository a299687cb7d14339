//! Attachment processing for ORM-style entities.
//!
//! An uploaded file becomes a stored original plus a set of named variants
//! and a JSON-serializable metadata record on the owning entity. The crates
//! split the work the usual way: `affix-core` holds the data model and the
//! driver/converter traits, `affix-storage` the storage drivers and key
//! generation, `affix-processing` the conversion pipeline. This crate ties
//! them together with the field registry and the lifecycle subscriber.

pub mod registry;
pub mod subscriber;

pub use registry::FieldRegistry;
pub use subscriber::AttachmentSubscriber;

pub use affix_core::{
    Attachment, AttachmentConfig, AttachmentConfigBuilder, AttachmentError, AttachmentHost,
    AttachmentOptions, AttachmentRecord, AttachmentResult, BlurhashComponents, BlurhashPolicy,
    ConvertInput, ConvertOutput, Converter, EncodeSpec, OutputFormat, RawFile, RenamePolicy,
    ResizeFit, ResizeSpec, StorageDriver, StorageError, VariantRecord, VariantRef, VariantSpec,
};
pub use affix_processing::ImageConverter;
pub use affix_storage::{generate_key, normalize_file_name, LocalDriver, MemoryDriver};
