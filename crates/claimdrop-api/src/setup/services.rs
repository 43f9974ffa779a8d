//! Service wiring

use crate::state::AppState;
use claimdrop_core::Config;
use claimdrop_db::ClaimRegistry;
use claimdrop_services::{
    ClaimListingService, FinalizationCoordinator, IdentityResolver, IntakeService,
    PresignedUploadIssuer,
};
use claimdrop_storage::ObjectStore;
use std::sync::Arc;

/// Build the services over an already-connected registry and object store
pub fn initialize_services(
    config: &Config,
    registry: Arc<dyn ClaimRegistry>,
    store: Arc<dyn ObjectStore>,
) -> Arc<AppState> {
    let resolver = IdentityResolver::new(config.dev_bypass_auth);

    let issuer = PresignedUploadIssuer::new(
        store.clone(),
        config.presign_ttl(),
        Some(config.s3_sse.clone()),
    );

    let intake = IntakeService::new(resolver, registry.clone(), Arc::new(issuer));
    let listing =
        ClaimListingService::new(resolver, registry.clone(), config.list_default_limit);
    let finalizer = FinalizationCoordinator::new(
        store.clone(),
        registry,
        config.content_type_policy,
        config.request_timeout(),
    );

    tracing::info!(
        presign_ttl_secs = config.presign_ttl_secs,
        content_type_policy = %config.content_type_policy,
        "Services initialized"
    );

    Arc::new(AppState {
        config: config.clone(),
        intake,
        listing,
        finalizer,
        registry_backend: config.registry_backend.to_string(),
        storage_backend: store.backend_type().to_string(),
    })
}
