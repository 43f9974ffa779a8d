//! OpenAPI documentation, served at `/api/openapi.json` and browsable at `/docs`.

use utoipa::OpenApi;

use crate::handlers;
use claimdrop_core::models;
use claimdrop_infra::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Claimdrop API",
        version = "0.1.0",
        description = "Two-phase upload claims: register a claim, upload the file directly to object storage with the issued credential, and let the storage notification finalize it. All claim endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::claims::create_claim,
        handlers::claims::list_claims,
        handlers::claims::get_claim,
        handlers::notifications::receive_upload_notifications,
        handlers::health::health_check,
    ),
    components(schemas(
        models::IntakeRequest,
        models::IntakeResponse,
        models::UploadCredential,
        models::ClaimSummary,
        models::ClaimStatus,
        models::UploadNotification,
        models::BatchReport,
        models::NotificationFailure,
        handlers::health::HealthResponse,
        ErrorResponse,
    )),
    tags(
        (name = "claims", description = "Claim intake and listing"),
        (name = "notifications", description = "Object store upload notifications"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
