//! The attachment entity
//!
//! An `Attachment` is the value object representing one logically attached
//! file. It is in exactly one of two states: `Pending` (holding the raw
//! uploaded file, not yet stored) or `Processed` (holding the immutable
//! metadata record). The transition is one-directional and irreversible for
//! the lifetime of the in-memory object; re-upload means constructing a
//! fresh attachment with [`Attachment::from_raw_file`].
//!
//! Read accessors require the processed state plus a bound storage driver
//! and fail fast with `NotProcessed` otherwise. Network/disk I/O happens
//! only inside the accessors that must reach storage.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::{json, Value as JsonValue};
use tokio::fs;

use crate::driver::{ByteStream, StorageDriver, StorageError};
use crate::error::{AttachmentError, AttachmentResult};
use crate::record::AttachmentRecord;

/// A raw uploaded file bound to an entity field, not yet stored.
#[derive(Debug, Clone)]
pub struct RawFile {
    name: String,
    content_type: String,
    source: FileSource,
}

#[derive(Debug, Clone)]
enum FileSource {
    Bytes(Bytes),
    Path(PathBuf),
}

impl RawFile {
    /// A file already held in memory (e.g. from a multipart body).
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        RawFile {
            name: name.into(),
            content_type: content_type.into(),
            source: FileSource::Bytes(data.into()),
        }
    }

    /// A file on disk, read lazily on first use.
    pub fn from_path(
        name: impl Into<String>,
        content_type: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        RawFile {
            name: name.into(),
            content_type: content_type.into(),
            source: FileSource::Path(path.into()),
        }
    }

    /// Client-supplied file name, verbatim.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client-declared content type. Only trusted as a fallback when content
    /// sniffing is inconclusive.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Extension taken from the client file name, without the dot. Empty
    /// when the name has none.
    pub fn declared_extension(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("")
    }

    /// Read the file's bytes. Path-backed files hit the filesystem on every
    /// call; the pipeline reads once and caches.
    pub async fn read(&self) -> AttachmentResult<Bytes> {
        match &self.source {
            FileSource::Bytes(data) => Ok(data.clone()),
            FileSource::Path(path) => {
                let data = fs::read(path).await.map_err(StorageError::from)?;
                Ok(Bytes::from(data))
            }
        }
    }
}

enum State {
    Pending(RawFile),
    Processed(AttachmentRecord),
}

/// One logically attached file: either a pending upload or a processed,
/// immutable metadata record. See the module docs for the state contract.
pub struct Attachment {
    state: State,
    driver: Option<Arc<dyn StorageDriver>>,
}

impl Attachment {
    /// New attachment around a freshly uploaded file, in the pending state.
    pub fn from_raw_file(file: RawFile) -> Self {
        Attachment {
            state: State::Pending(file),
            driver: None,
        }
    }

    /// Hydrate a processed attachment from its stored record.
    pub fn from_record(record: AttachmentRecord) -> Self {
        Attachment {
            state: State::Processed(record),
            driver: None,
        }
    }

    /// Hydrate from a raw database column value (JSON string or object).
    pub fn from_column_value(value: &JsonValue) -> AttachmentResult<Self> {
        Ok(Attachment::from_record(AttachmentRecord::from_column_value(
            value,
        )?))
    }

    pub fn is_processed(&self) -> bool {
        matches!(self.state, State::Processed(_))
    }

    /// The raw file handle while pending.
    pub fn raw_file(&self) -> Option<&RawFile> {
        match &self.state {
            State::Pending(file) => Some(file),
            State::Processed(_) => None,
        }
    }

    /// The stored record when processed, `None` while pending. Never errors;
    /// this is what the persistence layer writes to the column.
    pub fn serialize(&self) -> Option<&AttachmentRecord> {
        match &self.state {
            State::Processed(record) => Some(record),
            State::Pending(_) => None,
        }
    }

    /// Column value for the persistence layer: the record object when
    /// processed, JSON null while pending.
    pub fn to_column_value(&self) -> JsonValue {
        self.serialize()
            .map(AttachmentRecord::to_column_value)
            .unwrap_or(JsonValue::Null)
    }

    /// Transition `Pending -> Processed`. A no-op (not an error) when the
    /// attachment is already processed, so double invocation within one
    /// commit cycle is harmless.
    pub fn commit(&mut self, record: AttachmentRecord) {
        if self.is_processed() {
            tracing::debug!(
                name = %record.name,
                "attachment already processed, ignoring repeat commit"
            );
            return;
        }
        self.state = State::Processed(record);
    }

    /// Bind the storage driver the read accessors go through. The driver is
    /// a shared, non-owning reference into the process-wide registry.
    pub fn bind_driver(&mut self, driver: Arc<dyn StorageDriver>) {
        self.driver = Some(driver);
    }

    /// Drive name recorded at processing time.
    pub fn drive_name(&self) -> AttachmentResult<&str> {
        Ok(&self.record()?.drive)
    }

    /// Mime type of the original, or of a named variant.
    pub fn mime_type(&self, variant: Option<&str>) -> AttachmentResult<&str> {
        let (record, _) = self.bound()?;
        match variant {
            None => Ok(&record.mime_type),
            Some(name) => Ok(&self.variant_record(record, name)?.mime_type),
        }
    }

    /// Public URL of the original or a named variant, when the bound driver
    /// exposes one.
    pub async fn url(&self, variant: Option<&str>) -> AttachmentResult<Option<String>> {
        let (record, driver) = self.bound()?;
        let path = self.resolve_path(record, variant)?;
        Ok(driver.get_url(path).await?)
    }

    /// Temporary signed URL of the original or a named variant.
    pub async fn signed_url(
        &self,
        variant: Option<&str>,
        expires_in: Duration,
    ) -> AttachmentResult<String> {
        let (record, driver) = self.bound()?;
        let path = self.resolve_path(record, variant)?;
        Ok(driver.get_signed_url(path, expires_in).await?)
    }

    /// Full bytes of the original or a named variant.
    pub async fn bytes(&self, variant: Option<&str>) -> AttachmentResult<Bytes> {
        let (record, driver) = self.bound()?;
        let path = self.resolve_path(record, variant)?;
        Ok(driver.get_bytes(path).await?)
    }

    /// Byte stream of the original or a named variant.
    pub async fn stream(&self, variant: Option<&str>) -> AttachmentResult<ByteStream> {
        let (record, driver) = self.bound()?;
        let path = self.resolve_path(record, variant)?;
        Ok(driver.get_stream(path).await?)
    }

    /// Presentation value for API responses: the stored public URL plus the
    /// blurhash, without reaching storage.
    pub fn to_json(&self) -> AttachmentResult<JsonValue> {
        let record = self.record()?;
        Ok(json!({
            "url": record.url,
            "blurhash": record.blurhash,
        }))
    }

    fn record(&self) -> AttachmentResult<&AttachmentRecord> {
        match &self.state {
            State::Processed(record) => Ok(record),
            State::Pending(_) => Err(AttachmentError::NotProcessed),
        }
    }

    fn bound(&self) -> AttachmentResult<(&AttachmentRecord, &Arc<dyn StorageDriver>)> {
        let record = self.record()?;
        let driver = self.driver.as_ref().ok_or(AttachmentError::NotProcessed)?;
        Ok((record, driver))
    }

    fn variant_record<'a>(
        &self,
        record: &'a AttachmentRecord,
        name: &str,
    ) -> AttachmentResult<&'a crate::record::VariantRecord> {
        record
            .variant(name)
            .ok_or_else(|| AttachmentError::VariantNotFound(name.to_string()))
    }

    fn resolve_path<'a>(
        &self,
        record: &'a AttachmentRecord,
        variant: Option<&str>,
    ) -> AttachmentResult<&'a str> {
        match variant {
            None => Ok(&record.path),
            Some(name) => Ok(&self.variant_record(record, name)?.path),
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Attachment");
        match &self.state {
            State::Pending(file) => s.field("state", &"pending").field("file", &file.name()),
            State::Processed(record) => s.field("state", &"processed").field("path", &record.path),
        };
        s.field("driver_bound", &self.driver.is_some()).finish()
    }
}
