use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use claimdrop_core::constants::NOTIFICATION_SECRET_HEADER;
use claimdrop_core::models::{BatchReport, NotificationEnvelope};
use claimdrop_core::{AppError, UploadNotification};
use claimdrop_infra::ErrorResponse;
use std::sync::Arc;
use subtle::ConstantTimeEq;

fn verify_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get(NOTIFICATION_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    if bool::from(provided.ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "invalid notification secret".to_string(),
        ))
    }
}

/// Finalize claims for uploaded objects.
///
/// Accepts `{notifications: [...]}`, a single `{bucket_ref, location_ref}`, or
/// an S3 event document. Each notification is finalized independently; the
/// report lists the ones that were not.
#[utoipa::path(
    post,
    path = "/api/v0/notifications/uploads",
    tag = "notifications",
    request_body = UploadNotification,
    responses(
        (status = 200, description = "Batch processed", body = BatchReport),
        (status = 400, description = "Malformed notification", body = ErrorResponse),
        (status = 401, description = "Missing or wrong notification secret", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "upload_notifications"))]
pub async fn receive_upload_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(envelope): ValidatedJson<NotificationEnvelope>,
) -> Result<Json<BatchReport>, HttpAppError> {
    verify_secret(state.notification_secret(), &headers)?;

    let notifications = envelope.into_notifications();
    let report = state.finalizer.finalize_batch(&notifications).await;

    tracing::info!(
        processed = report.processed,
        finalized = report.finalized,
        failed = report.failed,
        "Upload notifications processed"
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(secret: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(secret) = secret {
            headers.insert(
                NOTIFICATION_SECRET_HEADER,
                HeaderValue::from_str(secret).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn test_secret_not_configured_accepts_all() {
        assert!(verify_secret(None, &headers(None)).is_ok());
    }

    #[test]
    fn test_secret_must_match() {
        assert!(verify_secret(Some("s3cret"), &headers(Some("s3cret"))).is_ok());
        assert!(verify_secret(Some("s3cret"), &headers(Some("s3cre"))).is_err());
        assert!(verify_secret(Some("s3cret"), &headers(None)).is_err());
    }
}
