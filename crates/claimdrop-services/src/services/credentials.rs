//! Upload credentials: presigned PUT URLs bound to the claim's metadata.

use async_trait::async_trait;
use chrono::Utc;
use claimdrop_core::constants::{META_CLAIM_ID, META_CLIENT, META_TAGS, META_USER_ID};
use claimdrop_core::{AppError, UploadCredential};
use claimdrop_storage::{ObjectStore, PutObjectSpec};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// What an upload has to carry for finalization to find its claim again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBinding {
    pub user_id: String,
    pub claim_id: String,
    pub content_type: String,
    pub tags: Vec<String>,
    pub client: String,
}

impl UploadBinding {
    pub fn metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (META_CLAIM_ID.to_string(), self.claim_id.clone()),
            (META_USER_ID.to_string(), self.user_id.clone()),
            (META_TAGS.to_string(), self.tags.join(",")),
            (META_CLIENT.to_string(), self.client.clone()),
        ])
    }
}

#[async_trait]
pub trait UploadCredentialIssuer: Send + Sync {
    async fn issue(
        &self,
        storage_location: &str,
        binding: &UploadBinding,
    ) -> Result<UploadCredential, AppError>;
}

/// Issues credentials by presigning a PUT on the object store
#[derive(Clone)]
pub struct PresignedUploadIssuer {
    store: Arc<dyn ObjectStore>,
    ttl: Duration,
    server_side_encryption: Option<String>,
}

impl PresignedUploadIssuer {
    /// `server_side_encryption` of `None` (or `"none"`) leaves the header out entirely.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        ttl: Duration,
        server_side_encryption: Option<String>,
    ) -> Self {
        let server_side_encryption = server_side_encryption
            .map(|sse| sse.trim().to_string())
            .filter(|sse| !sse.is_empty() && !sse.eq_ignore_ascii_case("none"));
        Self {
            store,
            ttl,
            server_side_encryption,
        }
    }
}

#[async_trait]
impl UploadCredentialIssuer for PresignedUploadIssuer {
    #[tracing::instrument(skip(self, binding), fields(claim_id = %binding.claim_id))]
    async fn issue(
        &self,
        storage_location: &str,
        binding: &UploadBinding,
    ) -> Result<UploadCredential, AppError> {
        let spec = PutObjectSpec {
            content_type: binding.content_type.clone(),
            server_side_encryption: self.server_side_encryption.clone(),
            metadata: binding.metadata(),
        };

        let issued_at = Utc::now();
        let presigned = self
            .store
            .presign_put(storage_location, &spec, self.ttl)
            .await?;

        Ok(UploadCredential {
            url: presigned.url,
            method: presigned.method,
            expires_in: self.ttl.as_secs(),
            expires_at: issued_at + chrono::Duration::seconds(self.ttl.as_secs() as i64),
            content_type: binding.content_type.clone(),
            required_headers: presigned.headers,
        })
    }
}
