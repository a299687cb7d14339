//! In-memory storage driver
//!
//! Keeps objects in a process-local map. Useful as an ephemeral backend and
//! for tests, where the put counter backs idempotency assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use affix_core::{ByteStream, StorageDriver, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;

struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Storage driver backed by an in-memory map.
#[derive(Default)]
pub struct MemoryDriver {
    objects: Mutex<HashMap<String, StoredObject>>,
    base_url: Option<String>,
    puts: AtomicUsize,
}

impl MemoryDriver {
    pub fn new() -> Self {
        MemoryDriver::default()
    }

    /// A driver that exposes public URLs under `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        MemoryDriver {
            base_url: Some(base_url.into()),
            ..MemoryDriver::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().expect("memory driver lock").contains_key(key)
    }

    /// Stored bytes for `key`, if present.
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .expect("memory driver lock")
            .get(key)
            .map(|o| o.data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .expect("memory driver lock")
            .get(key)
            .map(|o| o.content_type.clone())
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .expect("memory driver lock")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Number of `put` calls since construction.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn url_for(&self, key: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("memory://{key}"),
        }
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().expect("memory driver lock").insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        tracing::debug!(key = %key, "memory storage put");
        Ok(())
    }

    async fn get_url(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.base_url.as_ref().map(|_| self.url_for(key)))
    }

    async fn get_signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        Ok(format!(
            "{}?expires_in={}",
            self.url_for(key),
            expires_in.as_secs()
        ))
    }

    async fn get_bytes(&self, key: &str) -> StorageResult<Bytes> {
        self.object(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let data = self.get_bytes(key).await?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(data)])))
    }
}
