//! Content converter capability
//!
//! A converter declares support for an input (by sniffed mime type, size or
//! variant spec) and transforms it into an output buffer with its own mime
//! type and extension. The pipeline polls the configured converters in
//! registration order and the first one whose `supports` returns true wins;
//! when none match, the variant is skipped, which is a valid configuration
//! state rather than an error.
//!
//! Converters are pure with respect to the pipeline: they see only the bytes
//! and metadata handed to them, never storage or entity state.

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::VariantSpec;

/// Input handed to a converter: the cached source buffer plus the sniffed
/// file metadata and the variant being produced.
#[derive(Clone, Copy, Debug)]
pub struct ConvertInput<'a> {
    pub buffer: &'a [u8],
    pub size: u64,
    /// Mime type sniffed from byte content (not the client-declared one).
    pub mime_type: &'a str,
    pub extname: &'a str,
    pub variant_name: &'a str,
    pub variant: &'a VariantSpec,
}

/// Output of a conversion: the encoded buffer and its actual type.
#[derive(Clone, Debug)]
pub struct ConvertOutput {
    pub buffer: Bytes,
    pub mime_type: String,
    pub extname: String,
}

/// A polymorphic content transformation unit.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Whether this converter can handle `input`.
    async fn supports(&self, input: &ConvertInput<'_>) -> bool;

    /// Transform `input` according to `spec`.
    ///
    /// Only called after `supports` returned true for the same input.
    async fn handle(
        &self,
        input: &ConvertInput<'_>,
        spec: &VariantSpec,
    ) -> Result<ConvertOutput, anyhow::Error>;
}
