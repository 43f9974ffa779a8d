use crate::auth::CallerContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::with_deadline;
use crate::state::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use claimdrop_core::models::ListClaimsQuery;
use claimdrop_core::{ClaimSummary, IntakeRequest, IntakeResponse};
use claimdrop_infra::ErrorResponse;
use std::sync::Arc;

/// Register a claim and get a presigned upload credential for it
#[utoipa::path(
    post,
    path = "/api/v0/claims",
    tag = "claims",
    request_body = IntakeRequest,
    responses(
        (status = 200, description = "Claim registered", body = IntakeResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Caller could not be identified", body = ErrorResponse),
        (status = 502, description = "Credential could not be issued", body = ErrorResponse),
        (status = 504, description = "Deadline exceeded", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "create_claim"))]
pub async fn create_claim(
    CallerContext(ctx): CallerContext,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<IntakeRequest>,
) -> Result<Json<IntakeResponse>, HttpAppError> {
    let response = with_deadline(
        state.request_timeout(),
        "create_claim",
        state.intake.intake(&ctx, request),
    )
    .await?;
    Ok(Json(response))
}

/// List the caller's claims, newest first
#[utoipa::path(
    get,
    path = "/api/v0/claims",
    tag = "claims",
    params(ListClaimsQuery),
    responses(
        (status = 200, description = "Caller's claims", body = [ClaimSummary]),
        (status = 401, description = "Caller could not be identified", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "list_claims"))]
pub async fn list_claims(
    CallerContext(ctx): CallerContext,
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListClaimsQuery>, QueryRejection>,
) -> Result<Json<Vec<ClaimSummary>>, HttpAppError> {
    let Query(query) = query?;
    let claims = with_deadline(
        state.request_timeout(),
        "list_claims",
        state.listing.list(&ctx, query.limit),
    )
    .await?;
    Ok(Json(claims))
}

/// Get one of the caller's claims
#[utoipa::path(
    get,
    path = "/api/v0/claims/{claim_id}",
    tag = "claims",
    params(("claim_id" = String, Path, description = "Claim ID")),
    responses(
        (status = 200, description = "Claim", body = ClaimSummary),
        (status = 401, description = "Caller could not be identified", body = ErrorResponse),
        (status = 404, description = "No such claim for this caller", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "get_claim"))]
pub async fn get_claim(
    CallerContext(ctx): CallerContext,
    State(state): State<Arc<AppState>>,
    Path(claim_id): Path<String>,
) -> Result<Json<ClaimSummary>, HttpAppError> {
    let claim = with_deadline(
        state.request_timeout(),
        "get_claim",
        state.listing.get(&ctx, &claim_id),
    )
    .await?;
    Ok(Json(claim))
}
