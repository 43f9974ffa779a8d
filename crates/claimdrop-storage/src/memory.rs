//! In-process object store for local development and tests.
//!
//! Presigned URLs point at `memory://` and cannot be used over the network;
//! uploads are simulated with [`MemoryObjectStore::put_object`].

use crate::traits::{
    ObjectMetadata, ObjectStore, PresignedPut, PutObjectSpec, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredObject {
    size_bytes: i64,
    etag: String,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
    last_modified: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: Arc<Mutex<HashMap<(String, String), StoredObject>>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::default(),
        }
    }

    /// Store an object as if a client had completed a presigned upload.
    pub fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: Option<&str>,
        metadata: impl IntoIterator<Item = (String, String)>,
    ) {
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        let object = StoredObject {
            size_bytes: body.len() as i64,
            etag: format!("\"{:016x}\"", hasher.finish()),
            content_type: content_type.map(str::to_string),
            metadata: metadata.into_iter().collect(),
            last_modified: Utc::now(),
        };
        self.lock()
            .insert((bucket.to_string(), key.to_string()), object);
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), StoredObject>> {
        // A poisoned map is still consistent: every write is a single insert.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        spec: &PutObjectSpec,
        expires_in: Duration,
    ) -> StorageResult<PresignedPut> {
        if key.is_empty() || key.starts_with('/') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(PresignedPut {
            url: format!(
                "memory://{}/{}?expires_in={}",
                self.bucket,
                key,
                expires_in.as_secs()
            ),
            method: "PUT".to_string(),
            headers: spec.required_headers(),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        let object = self
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(ObjectMetadata::normalized(
            object.size_bytes,
            Some(&object.etag),
            object.content_type.as_deref(),
            object.metadata,
        )
        .with_last_modified(Some(object.last_modified)))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
