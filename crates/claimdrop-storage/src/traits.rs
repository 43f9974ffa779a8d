//! Object store abstraction trait
//!
//! Claim uploads never pass through this service: the client writes straight
//! to the store with a presigned PUT, and finalization reads the result back
//! with a HEAD. Those are the only two operations a backend has to provide.

use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use claimdrop_core::AppError;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("object not found: {}", key)),
            StorageError::InvalidKey(key) => {
                AppError::InvalidInput(format!("invalid storage location: {}", key))
            }
            StorageError::PresignFailed(msg) => AppError::Upstream(msg),
            StorageError::BackendError(msg) | StorageError::ConfigError(msg) => {
                AppError::Storage(msg)
            }
        }
    }
}

/// What a presigned PUT is bound to. Every field becomes a header the
/// uploader has to send unchanged, or the store rejects the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectSpec {
    pub content_type: String,
    pub server_side_encryption: Option<String>,
    /// User metadata, sent as `x-amz-meta-{key}`
    pub metadata: BTreeMap<String, String>,
}

impl PutObjectSpec {
    pub fn required_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), self.content_type.clone());
        if let Some(sse) = &self.server_side_encryption {
            headers.insert("x-amz-server-side-encryption".to_string(), sse.clone());
        }
        for (key, value) in &self.metadata {
            headers.insert(format!("x-amz-meta-{}", key), value.clone());
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedPut {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
}

/// Object attributes read back after upload, normalized: etag without quotes,
/// content type and metadata keys lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size_bytes: i64,
    pub etag: String,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
    /// When the store last wrote the object
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectMetadata {
    pub fn normalized(
        size_bytes: i64,
        etag: Option<&str>,
        content_type: Option<&str>,
        metadata: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            size_bytes,
            etag: etag.unwrap_or_default().trim_matches('"').to_string(),
            content_type: content_type
                .map(|ct| ct.trim().to_lowercase())
                .filter(|ct| !ct.is_empty()),
            metadata: metadata
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
            last_modified: None,
        }
    }

    pub fn with_last_modified(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Metadata value for `key`, trimmed; `None` if absent or blank
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Presign a PUT of `key` in the configured bucket, valid for `expires_in`
    async fn presign_put(
        &self,
        key: &str,
        spec: &PutObjectSpec,
        expires_in: Duration,
    ) -> StorageResult<PresignedPut>;

    /// Read an object's attributes. `StorageError::NotFound` when it does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata>;

    /// Bucket that presigned uploads target
    fn bucket(&self) -> &str;

    fn backend_type(&self) -> StorageBackend;
}
