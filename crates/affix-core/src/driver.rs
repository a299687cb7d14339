//! Storage driver abstraction
//!
//! This module defines the `StorageDriver` trait that all storage backends
//! must implement. The pipeline core only ever talks to drivers through this
//! trait, so any backend (local filesystem, object store, in-memory) can be
//! plugged in by registering it under a drive name in the configuration.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("storage backend error: {0}")]
    BackendError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte stream returned by [`StorageDriver::get_stream`].
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// One named storage backend.
///
/// Drivers are registered process-wide under a drive name and shared by
/// reference; implementations must be safe for concurrent use.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Store `data` under `key`, overwriting any existing object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Public URL for `key`, if this backend exposes one.
    async fn get_url(&self, key: &str) -> StorageResult<Option<String>>;

    /// Temporary URL granting direct access to `key` for `expires_in`.
    ///
    /// Backends without real signing return their public URL; backends with
    /// neither return a `ConfigError`.
    async fn get_signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Read the full object at `key` into memory.
    async fn get_bytes(&self, key: &str) -> StorageResult<Bytes>;

    /// Stream the object at `key` chunk by chunk (for large objects).
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;
}
