#[cfg(feature = "storage-memory")]
use crate::MemoryObjectStore;
#[cfg(feature = "storage-s3")]
use crate::S3ObjectStore;
use crate::{ObjectStore, StorageBackend, StorageError, StorageResult};
use claimdrop_core::Config;
use std::sync::Arc;

/// Create an object store based on configuration
pub async fn create_object_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let endpoint = config.s3_endpoint().map(String::from);

            let store = S3ObjectStore::new(bucket, config.s3_region.clone(), endpoint).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => {
            let bucket = config.s3_bucket().unwrap_or("claimdrop-local");
            tracing::warn!(bucket = %bucket, "Using in-memory object store; uploads are not persisted");
            Ok(Arc::new(MemoryObjectStore::new(bucket)))
        }

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}
