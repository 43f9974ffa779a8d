//! Claimdrop Services Layer
//!
//! The claim lifecycle: resolving who is calling, registering a claim and
//! handing out an upload credential, listing a user's claims, and finalizing
//! claims when the object store reports an upload. HTTP concerns stay in
//! claimdrop-api; storage and registry backends stay in their own crates.

pub mod services;

pub use claimdrop_db::{ClaimRegistry, MemoryClaimRegistry, PgClaimRegistry, RegistryError};
pub use claimdrop_storage::{
    create_object_store, KeyCodec, ObjectStore, StorageBackend, StorageError, StorageResult,
};
pub use services::credentials::{PresignedUploadIssuer, UploadBinding, UploadCredentialIssuer};
pub use services::finalize::{plan_finalization, FinalizationCoordinator, RegistryCommand};
pub use services::identity::{
    AuthorizerClaims, AuthorizerContext, IdentityResolver, IdentitySource, RequestContext,
    ResolvedIdentity,
};
pub use services::intake::IntakeService;
pub use services::listing::ClaimListingService;
