use chrono::Utc;
use claimdrop_core::models::new_claim_id;
use claimdrop_core::validation::validate_intake;
use claimdrop_core::{AppError, Claim, IntakeRequest, IntakeResponse};
use claimdrop_db::ClaimRegistry;
use claimdrop_storage::KeyCodec;
use std::sync::Arc;

use super::credentials::{UploadBinding, UploadCredentialIssuer};
use super::identity::{IdentityResolver, RequestContext};

/// Registers pending claims and hands out upload credentials
#[derive(Clone)]
pub struct IntakeService {
    resolver: IdentityResolver,
    registry: Arc<dyn ClaimRegistry>,
    issuer: Arc<dyn UploadCredentialIssuer>,
}

impl IntakeService {
    pub fn new(
        resolver: IdentityResolver,
        registry: Arc<dyn ClaimRegistry>,
        issuer: Arc<dyn UploadCredentialIssuer>,
    ) -> Self {
        Self {
            resolver,
            registry,
            issuer,
        }
    }

    /// Validate the request, register a PENDING claim and issue its credential.
    ///
    /// Nothing is written unless identity and validation both pass. If the
    /// credential cannot be issued, the pending record stays behind.
    #[tracing::instrument(
        skip_all,
        fields(user_id = tracing::field::Empty, claim_id = tracing::field::Empty)
    )]
    pub async fn intake(
        &self,
        ctx: &RequestContext,
        request: IntakeRequest,
    ) -> Result<IntakeResponse, AppError> {
        let identity = self.resolver.resolve(ctx)?;
        let valid = validate_intake(&request)?;

        let claim_id = new_claim_id();
        let span = tracing::Span::current();
        span.record("user_id", identity.user_id.as_str());
        span.record("claim_id", claim_id.as_str());

        let storage_location = KeyCodec::encode(&identity.user_id, &claim_id)?;

        let claim = Claim::pending(
            identity.user_id.clone(),
            claim_id.clone(),
            valid.filename,
            storage_location.clone(),
            valid.tags.clone(),
            valid.client.clone(),
            valid.content_type.clone(),
            Utc::now(),
        );
        self.registry.create_if_absent(&claim).await?;

        let binding = UploadBinding {
            user_id: identity.user_id,
            claim_id: claim_id.clone(),
            content_type: valid.content_type,
            tags: valid.tags,
            client: valid.client,
        };
        let upload_credential = self
            .issuer
            .issue(&storage_location, &binding)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    storage_location = %storage_location,
                    "Credential issue failed; pending claim left in place"
                );
                e
            })?;

        tracing::info!(storage_location = %storage_location, "Claim registered");

        Ok(IntakeResponse {
            claim_id,
            storage_location,
            upload_credential,
        })
    }
}
