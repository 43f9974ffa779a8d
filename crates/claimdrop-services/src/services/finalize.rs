//! Finalization of uploaded claims.
//!
//! The object store delivers upload notifications at least once and in any
//! order. For each one the coordinator reads the object back, works out which
//! claim it belongs to, and applies one conditional registry write. Repeating
//! that for a duplicate notification lands in the same terminal state.

use chrono::{DateTime, Utc};
use claimdrop_core::constants::{ACCEPTED_CONTENT_TYPE, META_CLAIM_ID, META_USER_ID};
use claimdrop_core::models::{
    BatchReport, ClaimStatus, Completion, FinalizeOutcome, NotificationFailure,
};
use claimdrop_core::{AppError, ContentTypePolicy, ErrorMetadata, UploadNotification};
use claimdrop_db::ClaimRegistry;
use claimdrop_storage::{unescape_location, KeyCodec, ObjectMetadata, ObjectStore};
use std::sync::Arc;
use std::time::Duration;

/// The registry write a notification turns into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCommand {
    Complete {
        user_id: String,
        claim_id: String,
        completion: Completion,
    },
    Fail {
        user_id: String,
        claim_id: String,
        reason: String,
    },
}

/// Identify the claim an object belongs to.
///
/// Metadata written at intake is preferred. When either value is missing the
/// storage location is decoded and fills the gap.
fn resolve_claim(location: &str, head: &ObjectMetadata) -> Result<(String, String), AppError> {
    let meta_user = head.meta(META_USER_ID);
    let meta_claim = head.meta(META_CLAIM_ID);

    if let (Some(user_id), Some(claim_id)) = (meta_user, meta_claim) {
        return Ok((user_id.to_string(), claim_id.to_string()));
    }

    match KeyCodec::decode(location) {
        Some((decoded_user, decoded_claim)) => Ok((
            meta_user.map(str::to_string).unwrap_or(decoded_user),
            meta_claim.map(str::to_string).unwrap_or(decoded_claim),
        )),
        None => Err(AppError::NotResolvable(format!(
            "cannot determine claim for {}",
            location
        ))),
    }
}

/// Media type without parameters, so `text/plain; charset=utf-8` is accepted.
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// Decide what a finalization does, given what the store reported.
///
/// The upload time is the store's last-modified time, so a repeated
/// notification for the same object writes the same completion. `now` is
/// used only when the store did not report one.
pub fn plan_finalization(
    location: &str,
    head: &ObjectMetadata,
    policy: ContentTypePolicy,
    now: DateTime<Utc>,
) -> Result<RegistryCommand, AppError> {
    let (user_id, claim_id) = resolve_claim(location, head)?;

    if let Some(content_type) = head.content_type.as_deref() {
        if essence(content_type) != ACCEPTED_CONTENT_TYPE {
            tracing::warn!(
                user_id = %user_id,
                claim_id = %claim_id,
                content_type = %content_type,
                policy = %policy,
                "Uploaded object has unexpected content type"
            );
            if policy == ContentTypePolicy::Reject {
                return Ok(RegistryCommand::Fail {
                    user_id,
                    claim_id,
                    reason: format!("unexpected content type: {}", content_type),
                });
            }
        }
    }

    Ok(RegistryCommand::Complete {
        user_id,
        claim_id,
        completion: Completion {
            size_bytes: head.size_bytes,
            etag: head.etag.clone(),
            uploaded_at: head.last_modified.unwrap_or(now),
        },
    })
}

#[derive(Clone)]
pub struct FinalizationCoordinator {
    store: Arc<dyn ObjectStore>,
    registry: Arc<dyn ClaimRegistry>,
    policy: ContentTypePolicy,
    item_timeout: Duration,
}

impl FinalizationCoordinator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        registry: Arc<dyn ClaimRegistry>,
        policy: ContentTypePolicy,
        item_timeout: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            policy,
            item_timeout,
        }
    }

    /// Finalize the claim behind one notification.
    ///
    /// `NotFound` when no claim was registered for the object (nothing is
    /// created), `NotResolvable` when the object cannot be tied to a claim or
    /// sits outside the bucket uploads are issued for.
    #[tracing::instrument(skip(self), fields(bucket = %notification.bucket_ref))]
    pub async fn finalize(
        &self,
        notification: &UploadNotification,
    ) -> Result<FinalizeOutcome, AppError> {
        if notification.bucket_ref != self.store.bucket() {
            return Err(AppError::NotResolvable(format!(
                "object is not in the upload bucket: {}",
                notification.bucket_ref
            )));
        }

        let location = unescape_location(&notification.location_ref);
        let head = self
            .store
            .head_object(&notification.bucket_ref, &location)
            .await?;

        match plan_finalization(&location, &head, self.policy, Utc::now())? {
            RegistryCommand::Complete {
                user_id,
                claim_id,
                completion,
            } => {
                self.registry
                    .complete_if_present(&user_id, &claim_id, &completion)
                    .await?;
                tracing::info!(
                    user_id = %user_id,
                    claim_id = %claim_id,
                    size_bytes = completion.size_bytes,
                    "Claim completed"
                );
                Ok(FinalizeOutcome::Completed { user_id, claim_id })
            }
            RegistryCommand::Fail {
                user_id,
                claim_id,
                reason,
            } => {
                let status = self
                    .registry
                    .fail_if_pending(&user_id, &claim_id, &reason)
                    .await?;
                match status {
                    ClaimStatus::Failed => {
                        tracing::info!(user_id = %user_id, claim_id = %claim_id, reason = %reason, "Claim failed");
                        Ok(FinalizeOutcome::Failed {
                            user_id,
                            claim_id,
                            reason,
                        })
                    }
                    _ => Ok(FinalizeOutcome::Completed { user_id, claim_id }),
                }
            }
        }
    }

    /// Finalize every notification independently. One failure is logged and
    /// recorded; it never stops the rest of the batch.
    pub async fn finalize_batch(&self, notifications: &[UploadNotification]) -> BatchReport {
        let mut report = BatchReport::default();

        for notification in notifications {
            report.processed += 1;
            let result = match tokio::time::timeout(self.item_timeout, self.finalize(notification))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(format!(
                    "finalization of {} exceeded {:?}",
                    notification.location_ref, self.item_timeout
                ))),
            };

            match result {
                Ok(_) => report.finalized += 1,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %notification.bucket_ref,
                        location = %notification.location_ref,
                        "Upload notification not finalized"
                    );
                    report.failed += 1;
                    report.failures.push(NotificationFailure {
                        location_ref: notification.location_ref.clone(),
                        message: e.client_message(),
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use claimdrop_core::Claim;
    use async_trait::async_trait;
    use claimdrop_db::MemoryClaimRegistry;
    use claimdrop_storage::{
        MemoryObjectStore, PresignedPut, PutObjectSpec, StorageBackend, StorageError,
        StorageResult,
    };

    const BUCKET: &str = "claims";
    const CLAIM: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";

    fn head(content_type: Option<&str>, meta: &[(&str, &str)]) -> ObjectMetadata {
        ObjectMetadata::normalized(
            10,
            Some("\"abc\""),
            content_type,
            meta.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn ids(command: &RegistryCommand) -> (&str, &str) {
        match command {
            RegistryCommand::Complete {
                user_id, claim_id, ..
            }
            | RegistryCommand::Fail {
                user_id, claim_id, ..
            } => (user_id, claim_id),
        }
    }

    #[test]
    fn test_metadata_preferred_over_location() {
        let command = plan_finalization(
            "user/u-from-key/C-from-key.txt",
            &head(
                Some("text/plain"),
                &[("user_id", "u-meta"), ("claim_id", "C-meta")],
            ),
            ContentTypePolicy::Warn,
            now(),
        )
        .unwrap();
        assert_eq!(ids(&command), ("u-meta", "C-meta"));
    }

    #[test]
    fn test_location_fills_missing_metadata() {
        let command = plan_finalization(
            "user/u-key/C-key.txt",
            &head(None, &[("user_id", "u-meta")]),
            ContentTypePolicy::Warn,
            now(),
        )
        .unwrap();
        assert_eq!(ids(&command), ("u-meta", "C-key"));

        let command = plan_finalization(
            "user/u-key/C-key.txt",
            &head(None, &[]),
            ContentTypePolicy::Warn,
            now(),
        )
        .unwrap();
        assert_eq!(ids(&command), ("u-key", "C-key"));
    }

    #[test]
    fn test_unresolvable_object() {
        let err = plan_finalization(
            "uploads/random.bin",
            &head(None, &[("user_id", "u-meta")]),
            ContentTypePolicy::Warn,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::NotResolvable(_)));
    }

    #[test]
    fn test_completion_carries_object_details() {
        let command = plan_finalization(
            "user/u/C.txt",
            &head(Some("text/plain; charset=utf-8"), &[]),
            ContentTypePolicy::Reject,
            now(),
        )
        .unwrap();
        assert_eq!(
            command,
            RegistryCommand::Complete {
                user_id: "u".to_string(),
                claim_id: "C".to_string(),
                completion: Completion {
                    size_bytes: 10,
                    etag: "abc".to_string(),
                    uploaded_at: now(),
                },
            }
        );
    }

    #[test]
    fn test_store_timestamp_used_as_upload_time() {
        let written = Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 0).unwrap();
        let head = head(Some("text/plain"), &[]).with_last_modified(Some(written));

        let command =
            plan_finalization("user/u/C.txt", &head, ContentTypePolicy::Warn, now()).unwrap();
        match command {
            RegistryCommand::Complete { completion, .. } => {
                assert_eq!(completion.uploaded_at, written)
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn test_content_type_policy() {
        let wrong = head(Some("image/png"), &[]);
        let warned =
            plan_finalization("user/u/C.txt", &wrong, ContentTypePolicy::Warn, now()).unwrap();
        assert!(matches!(warned, RegistryCommand::Complete { .. }));

        let rejected =
            plan_finalization("user/u/C.txt", &wrong, ContentTypePolicy::Reject, now()).unwrap();
        assert_eq!(
            rejected,
            RegistryCommand::Fail {
                user_id: "u".to_string(),
                claim_id: "C".to_string(),
                reason: "unexpected content type: image/png".to_string(),
            }
        );
    }

    struct Fixture {
        store: MemoryObjectStore,
        registry: Arc<MemoryClaimRegistry>,
        coordinator: FinalizationCoordinator,
    }

    fn fixture(policy: ContentTypePolicy) -> Fixture {
        let store = MemoryObjectStore::new(BUCKET);
        let registry = Arc::new(MemoryClaimRegistry::new());
        let coordinator = FinalizationCoordinator::new(
            Arc::new(store.clone()),
            registry.clone(),
            policy,
            Duration::from_secs(5),
        );
        Fixture {
            store,
            registry,
            coordinator,
        }
    }

    async fn register(registry: &MemoryClaimRegistry, user_id: &str, claim_id: &str) -> String {
        let location = KeyCodec::encode(user_id, claim_id).unwrap();
        let claim = Claim::pending(
            user_id,
            claim_id,
            "notes.txt",
            location.clone(),
            vec!["t".to_string()],
            "web",
            "text/plain",
            now(),
        );
        registry.create_if_absent(&claim).await.unwrap();
        location
    }

    fn upload(store: &MemoryObjectStore, location: &str, content_type: &str, body: &[u8]) {
        let (user_id, claim_id) = KeyCodec::decode(location).unwrap();
        store.put_object(
            BUCKET,
            location,
            body,
            Some(content_type),
            [
                ("user_id".to_string(), user_id),
                ("claim_id".to_string(), claim_id),
            ],
        );
    }

    #[tokio::test]
    async fn test_finalize_completes_pending_claim() {
        let fx = fixture(ContentTypePolicy::Warn);
        let location = register(&fx.registry, "u1", CLAIM).await;
        upload(&fx.store, &location, "text/plain", b"hello world");

        let outcome = fx
            .coordinator
            .finalize(&UploadNotification::new(BUCKET, &location))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FinalizeOutcome::Completed {
                user_id: "u1".to_string(),
                claim_id: CLAIM.to_string()
            }
        );

        let claim = fx.registry.get("u1", CLAIM).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Complete);
        assert_eq!(claim.size_bytes, Some(11));
        assert!(claim.etag.is_some());
        assert!(claim.uploaded_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_notifications_are_harmless() {
        let fx = fixture(ContentTypePolicy::Warn);
        let location = register(&fx.registry, "u1", CLAIM).await;
        upload(&fx.store, &location, "text/plain", b"abc");

        let notification = UploadNotification::new(BUCKET, &location);
        fx.coordinator.finalize(&notification).await.unwrap();
        let first = fx.registry.get("u1", CLAIM).await.unwrap().unwrap();

        let (a, b) = tokio::join!(
            fx.coordinator.finalize(&notification),
            fx.coordinator.finalize(&notification)
        );
        assert!(a.is_ok() && b.is_ok());

        let after = fx.registry.get("u1", CLAIM).await.unwrap().unwrap();
        assert_eq!(after.status, ClaimStatus::Complete);
        assert_eq!(after, first);
    }

    #[tokio::test]
    async fn test_redelivery_later_keeps_upload_time() {
        let fx = fixture(ContentTypePolicy::Warn);
        let location = register(&fx.registry, "u1", CLAIM).await;
        upload(&fx.store, &location, "text/plain", b"abc");

        let notification = UploadNotification::new(BUCKET, &location);
        fx.coordinator.finalize(&notification).await.unwrap();
        let first = fx.registry.get("u1", CLAIM).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        fx.coordinator.finalize(&notification).await.unwrap();
        let second = fx.registry.get("u1", CLAIM).await.unwrap().unwrap();

        assert!(first.uploaded_at.is_some());
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_object_outside_upload_bucket_is_ignored() {
        let fx = fixture(ContentTypePolicy::Warn);
        let location = register(&fx.registry, "victim", CLAIM).await;
        fx.store.put_object(
            "someone-elses-bucket",
            &location,
            b"forged!!",
            Some("text/plain"),
            [
                ("user_id".to_string(), "victim".to_string()),
                ("claim_id".to_string(), CLAIM.to_string()),
            ],
        );

        let err = fx
            .coordinator
            .finalize(&UploadNotification::new("someone-elses-bucket", &location))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotResolvable(_)));

        let claim = fx.registry.get("victim", CLAIM).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(claim.size_bytes, None);
    }

    #[tokio::test]
    async fn test_unregistered_object_is_not_found() {
        let fx = fixture(ContentTypePolicy::Warn);
        let location = KeyCodec::encode("u1", CLAIM).unwrap();
        upload(&fx.store, &location, "text/plain", b"orphan");

        let err = fx
            .coordinator
            .finalize(&UploadNotification::new(BUCKET, &location))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(fx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_escaped_location_is_decoded() {
        let fx = fixture(ContentTypePolicy::Warn);
        let location = register(&fx.registry, "jane doe", CLAIM).await;
        fx.store
            .put_object(BUCKET, &location, b"x", Some("text/plain"), std::iter::empty());

        let escaped = location.replace(' ', "+");
        fx.coordinator
            .finalize(&UploadNotification::new(BUCKET, escaped))
            .await
            .unwrap();
        let claim = fx.registry.get("jane doe", CLAIM).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Complete);
    }

    #[tokio::test]
    async fn test_reject_policy_fails_claim() {
        let fx = fixture(ContentTypePolicy::Reject);
        let location = register(&fx.registry, "u1", CLAIM).await;
        upload(&fx.store, &location, "application/octet-stream", b"\x00\x01");

        let outcome = fx
            .coordinator
            .finalize(&UploadNotification::new(BUCKET, &location))
            .await
            .unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Failed { .. }));

        let claim = fx.registry.get("u1", CLAIM).await.unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Failed);
        assert!(claim
            .failure_reason
            .unwrap()
            .contains("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let fx = fixture(ContentTypePolicy::Warn);
        let good = register(&fx.registry, "u1", "01A").await;
        upload(&fx.store, &good, "text/plain", b"ok");
        let also_good = register(&fx.registry, "u2", "01B").await;
        upload(&fx.store, &also_good, "text/plain", b"ok");

        let report = fx
            .coordinator
            .finalize_batch(&[
                UploadNotification::new(BUCKET, "user/u9/missing.txt"),
                UploadNotification::new(BUCKET, &good),
                UploadNotification::new(BUCKET, "not/a/claim"),
                UploadNotification::new(BUCKET, &also_good),
            ])
            .await;

        assert_eq!(report.processed, 4);
        assert_eq!(report.finalized, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.failures[0].location_ref, "user/u9/missing.txt");
        assert_eq!(
            fx.registry.get("u2", "01B").await.unwrap().unwrap().status,
            ClaimStatus::Complete
        );
    }

    struct UnreachableStore;

    #[async_trait]
    impl ObjectStore for UnreachableStore {
        async fn presign_put(
            &self,
            key: &str,
            _spec: &PutObjectSpec,
            _expires_in: Duration,
        ) -> StorageResult<PresignedPut> {
            Err(StorageError::PresignFailed(key.to_string()))
        }

        async fn head_object(&self, _bucket: &str, _key: &str) -> StorageResult<ObjectMetadata> {
            Err(StorageError::BackendError(
                "dispatch failure: connection refused (os error 111) to 10.0.3.7:9000".to_string(),
            ))
        }

        fn bucket(&self) -> &str {
            BUCKET
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::S3
        }
    }

    #[tokio::test]
    async fn test_batch_failures_hide_storage_detail() {
        let registry = Arc::new(MemoryClaimRegistry::new());
        let location = register(&registry, "u1", CLAIM).await;
        let coordinator = FinalizationCoordinator::new(
            Arc::new(UnreachableStore),
            registry.clone(),
            ContentTypePolicy::Warn,
            Duration::from_secs(5),
        );

        let report = coordinator
            .finalize_batch(&[UploadNotification::new(BUCKET, &location)])
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].location_ref, location);
        assert_eq!(report.failures[0].message, "storage error");
        assert!(!report.failures[0].message.contains("10.0.3.7"));
    }
}
