//! Conversion pipeline: content analysis, image conversion, perceptual
//! hashing and the per-attachment orchestrator.

pub mod blur;
pub mod image;
pub mod pipeline;
pub mod sniff;

pub use blur::image_to_blurhash;
pub use image::ImageConverter;
pub use pipeline::{process_attachment, AttachmentProcessor};
pub use sniff::{analyze, FileInfo};
