//! Content-based file type detection
//!
//! The pipeline trusts byte content over the client-declared content type.
//! When magic-number detection is inconclusive the declared type and the
//! extension from the client file name are used as a graceful fallback; the
//! fallback extension is normalized because it is user-supplied.

use affix_core::RawFile;
use affix_storage::normalize_file_name;

/// Result of analyzing a raw file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Extension without the dot.
    pub extname: String,
    pub mime_type: String,
    /// Size of the raw file in bytes.
    pub size: u64,
}

/// Sniff mime type and extension from `buffer`, falling back to the
/// declared values on `file`.
pub fn analyze(buffer: &[u8], file: &RawFile) -> FileInfo {
    match infer::get(buffer) {
        Some(kind) => FileInfo {
            extname: kind.extension().to_string(),
            mime_type: kind.mime_type().to_string(),
            size: buffer.len() as u64,
        },
        None => {
            tracing::debug!(
                name = %file.name(),
                declared = %file.content_type(),
                "content sniffing inconclusive, using declared type"
            );
            FileInfo {
                extname: normalize_file_name(file.declared_extension()),
                mime_type: file.content_type().to_string(),
                size: buffer.len() as u64,
            }
        }
    }
}
