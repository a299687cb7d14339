//! Affix Storage Library
//!
//! Storage driver implementations and key generation for the attachment
//! pipeline. The `StorageDriver` trait itself lives in `affix-core`; this
//! crate provides the local filesystem and in-memory backends plus the
//! `keys` module every caller derives storage keys through.
//!
//! # Storage key format
//!
//! `{folder}/{name}/{file}` with forward slashes on every OS, where the
//! folder comes from a per-field template (with `:placeholder` substitution)
//! and every user-supplied segment has been normalized. See [`keys`].

pub mod keys;
pub mod local;
pub mod memory;

// Re-export commonly used types
pub use affix_core::{ByteStream, StorageDriver, StorageError, StorageResult};
pub use keys::{generate_key, normalize_file_name};
pub use local::LocalDriver;
pub use memory::MemoryDriver;
