use claimdrop_core::{AppError, ClaimSummary};
use claimdrop_db::ClaimRegistry;
use std::sync::Arc;

use super::identity::{IdentityResolver, RequestContext};

/// Read side of the registry, scoped to the calling user
#[derive(Clone)]
pub struct ClaimListingService {
    resolver: IdentityResolver,
    registry: Arc<dyn ClaimRegistry>,
    default_limit: i64,
}

impl ClaimListingService {
    pub fn new(
        resolver: IdentityResolver,
        registry: Arc<dyn ClaimRegistry>,
        default_limit: i64,
    ) -> Self {
        Self {
            resolver,
            registry,
            default_limit,
        }
    }

    /// The caller's claims, newest first. A missing or non-positive limit uses the default.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        limit: Option<i64>,
    ) -> Result<Vec<ClaimSummary>, AppError> {
        let identity = self.resolver.resolve(ctx)?;
        let limit = match limit {
            Some(l) if l > 0 => l,
            _ => self.default_limit,
        };

        let claims = self
            .registry
            .list_by_owner(&identity.user_id, limit)
            .await?;

        tracing::debug!(user_id = %identity.user_id, count = claims.len(), "Claims listed");
        Ok(claims.into_iter().map(ClaimSummary::from).collect())
    }

    /// One of the caller's claims. Another user's claim ID is reported as not found.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get(&self, ctx: &RequestContext, claim_id: &str) -> Result<ClaimSummary, AppError> {
        let identity = self.resolver.resolve(ctx)?;
        self.registry
            .get(&identity.user_id, claim_id)
            .await?
            .map(ClaimSummary::from)
            .ok_or_else(|| AppError::NotFound("claim not found".to_string()))
    }
}
