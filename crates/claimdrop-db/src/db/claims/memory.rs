use async_trait::async_trait;
use claimdrop_core::models::{Claim, ClaimStatus, Completion};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{effective_limit, ClaimRegistry, RegistryError};

type ClaimKey = (String, String);

/// In-memory claim registry. Each method runs under one short-lived lock,
/// which gives the same per-record atomicity as the conditional SQL.
#[derive(Clone, Default)]
pub struct MemoryClaimRegistry {
    claims: Arc<Mutex<BTreeMap<ClaimKey, Claim>>>,
}

impl MemoryClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ClaimKey, Claim>> {
        // No method leaves a half-applied update behind, so a poisoned map is usable.
        self.claims
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn key(user_id: &str, claim_id: &str) -> ClaimKey {
    (user_id.to_string(), claim_id.to_string())
}

#[async_trait]
impl ClaimRegistry for MemoryClaimRegistry {
    async fn create_if_absent(&self, claim: &Claim) -> Result<(), RegistryError> {
        let mut claims = self.lock();
        let k = key(&claim.user_id, &claim.claim_id);
        if claims.contains_key(&k) {
            return Err(RegistryError::already_exists(&claim.user_id, &claim.claim_id));
        }
        claims.insert(k, claim.clone());
        Ok(())
    }

    async fn complete_if_present(
        &self,
        user_id: &str,
        claim_id: &str,
        completion: &Completion,
    ) -> Result<(), RegistryError> {
        let mut claims = self.lock();
        let claim = claims
            .get_mut(&key(user_id, claim_id))
            .ok_or_else(|| RegistryError::not_found(user_id, claim_id))?;

        if claim.status == ClaimStatus::Failed {
            return Err(RegistryError::terminal(user_id, claim_id, claim.status));
        }

        claim.status = ClaimStatus::Complete;
        claim.uploaded_at = Some(completion.uploaded_at);
        claim.size_bytes = Some(completion.size_bytes);
        claim.etag = Some(completion.etag.clone());
        Ok(())
    }

    async fn fail_if_pending(
        &self,
        user_id: &str,
        claim_id: &str,
        reason: &str,
    ) -> Result<ClaimStatus, RegistryError> {
        let mut claims = self.lock();
        let claim = claims
            .get_mut(&key(user_id, claim_id))
            .ok_or_else(|| RegistryError::not_found(user_id, claim_id))?;

        if claim.status == ClaimStatus::Pending {
            claim.status = ClaimStatus::Failed;
            claim.failure_reason = Some(reason.to_string());
        }
        Ok(claim.status)
    }

    async fn get(&self, user_id: &str, claim_id: &str) -> Result<Option<Claim>, RegistryError> {
        Ok(self.lock().get(&key(user_id, claim_id)).cloned())
    }

    async fn list_by_owner(&self, user_id: &str, limit: i64) -> Result<Vec<Claim>, RegistryError> {
        let claims = self.lock();
        // Keys sort by (user_id, claim_id), so one owner's claims are contiguous.
        let owned = claims
            .range(key(user_id, "")..)
            .take_while(|((owner, _), _)| owner == user_id)
            .map(|(_, claim)| claim.clone())
            .collect::<Vec<_>>();

        Ok(owned
            .into_iter()
            .rev()
            .take(effective_limit(limit) as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn pending(user_id: &str, claim_id: &str) -> Claim {
        Claim::pending(
            user_id,
            claim_id,
            "notes.txt",
            format!("user/{}/{}.txt", user_id, claim_id),
            vec!["a".to_string()],
            "web",
            "text/plain",
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn completion(size: i64) -> Completion {
        Completion {
            size_bytes: size,
            etag: format!("etag-{}", size),
            uploaded_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 5, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_is_conditional() {
        let registry = MemoryClaimRegistry::new();
        registry.create_if_absent(&pending("u1", "C1")).await.unwrap();

        let mut second = pending("u1", "C1");
        second.filename = "other.txt".to_string();
        let err = registry.create_if_absent(&second).await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { .. }));

        let stored = registry.get("u1", "C1").await.unwrap().unwrap();
        assert_eq!(stored.filename, "notes.txt");

        // Same claim ID under another owner is a different record.
        registry.create_if_absent(&pending("u2", "C1")).await.unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_creates_have_one_winner() {
        let registry = Arc::new(MemoryClaimRegistry::new());
        let attempts = (0..16).map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.create_if_absent(&pending("u1", "RACE")).await })
        });
        let results = futures::future::join_all(attempts).await;

        let winners = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() {
        let registry = MemoryClaimRegistry::new();
        registry.create_if_absent(&pending("u1", "C1")).await.unwrap();

        registry
            .complete_if_present("u1", "C1", &completion(12))
            .await
            .unwrap();
        let first = registry.get("u1", "C1").await.unwrap().unwrap();

        registry
            .complete_if_present("u1", "C1", &completion(12))
            .await
            .unwrap();
        let second = registry.get("u1", "C1").await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(second.status, ClaimStatus::Complete);
        assert_eq!(second.size_bytes, Some(12));
        assert_eq!(second.etag.as_deref(), Some("etag-12"));
    }

    #[tokio::test]
    async fn test_completion_of_missing_claim_creates_nothing() {
        let registry = MemoryClaimRegistry::new();
        let err = registry
            .complete_if_present("u1", "GHOST", &completion(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_status_never_moves_backward() {
        let registry = MemoryClaimRegistry::new();
        registry.create_if_absent(&pending("u1", "C1")).await.unwrap();
        registry
            .complete_if_present("u1", "C1", &completion(3))
            .await
            .unwrap();

        let status = registry
            .fail_if_pending("u1", "C1", "wrong content type")
            .await
            .unwrap();
        assert_eq!(status, ClaimStatus::Complete);

        registry.create_if_absent(&pending("u1", "C2")).await.unwrap();
        let status = registry.fail_if_pending("u1", "C2", "bad").await.unwrap();
        assert_eq!(status, ClaimStatus::Failed);

        let err = registry
            .complete_if_present("u1", "C2", &completion(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::TerminalState {
                status: ClaimStatus::Failed,
                ..
            }
        ));
        let failed = registry.get("u1", "C2").await.unwrap().unwrap();
        assert_eq!(failed.failure_reason.as_deref(), Some("bad"));
        assert_eq!(failed.size_bytes, None);
    }

    #[tokio::test]
    async fn test_list_newest_first_per_owner() {
        let registry = MemoryClaimRegistry::new();
        for claim_id in ["01A", "01C", "01B"] {
            registry
                .create_if_absent(&pending("u1", claim_id))
                .await
                .unwrap();
        }
        registry.create_if_absent(&pending("u0", "01Z")).await.unwrap();
        registry.create_if_absent(&pending("u10", "01Y")).await.unwrap();

        let ids: Vec<String> = registry
            .list_by_owner("u1", 0)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.claim_id)
            .collect();
        assert_eq!(ids, vec!["01C", "01B", "01A"]);

        let limited = registry.list_by_owner("u1", 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].claim_id, "01C");

        assert!(registry.list_by_owner("nobody", 10).await.unwrap().is_empty());
    }
}
