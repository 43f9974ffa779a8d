use crate::traits::{
    ObjectMetadata, ObjectStore, PresignedPut, PutObjectSpec, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// S3 object store
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a new S3ObjectStore
    ///
    /// # Arguments
    /// * `bucket` - bucket presigned uploads target
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint (MinIO, LocalStack); switches to path-style addressing
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let region_provider = RegionProviderChain::first_try(aws_config::Region::new(region));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        let client = if let Some(ref endpoint) = endpoint_url {
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config);
            if let Some(provider) = config.credentials_provider() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            s3_config_builder = s3_config_builder.force_path_style(true);
            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        tracing::info!(
            bucket = %bucket,
            endpoint = ?endpoint_url,
            "S3 object store initialized"
        );

        Ok(Self { client, bucket })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        spec: &PutObjectSpec,
        expires_in: Duration,
    ) -> StorageResult<PresignedPut> {
        let presigning_config = PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let metadata: HashMap<String, String> = spec
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(&spec.content_type)
            .set_server_side_encryption(
                spec.server_side_encryption
                    .as_deref()
                    .map(ServerSideEncryption::from),
            )
            .set_metadata(Some(metadata))
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 presign failed"
                );
                StorageError::PresignFailed(e.to_string())
            })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            expires_in_secs = expires_in.as_secs(),
            "S3 PUT presigned"
        );

        Ok(PresignedPut {
            url: presigned.uri().to_string(),
            method: presigned.method().to_string(),
            headers: spec.required_headers(),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    HeadObjectError::NotFound(_) => StorageError::NotFound(key.to_string()),
                    _ => {
                        tracing::error!(
                            error = %e,
                            bucket = %bucket,
                            key = %key,
                            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "S3 head failed"
                        );
                        StorageError::BackendError(e.to_string())
                    }
                },
                _ => {
                    tracing::error!(
                        error = %e,
                        bucket = %bucket,
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 head failed"
                    );
                    StorageError::BackendError(e.to_string())
                }
            })?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = response.content_length().unwrap_or_default(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 head successful"
        );

        Ok(ObjectMetadata::normalized(
            response.content_length().unwrap_or_default(),
            response.e_tag(),
            response.content_type(),
            response.metadata().cloned().unwrap_or_default(),
        )
        .with_last_modified(
            response
                .last_modified()
                .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
        ))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
