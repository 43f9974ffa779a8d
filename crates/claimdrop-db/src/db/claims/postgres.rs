use async_trait::async_trait;
use claimdrop_core::models::{Claim, ClaimStatus, Completion};
use sqlx::{PgPool, Row};

use super::{effective_limit, ClaimRegistry, RegistryError};

const CLAIM_COLUMNS: &str = r#"
    user_id, claim_id, filename, storage_location, tags, client, content_type,
    status, created_at, uploaded_at, size_bytes, etag, failure_reason
"#;

/// Postgres-backed claim registry
#[derive(Clone)]
pub struct PgClaimRegistry {
    pool: PgPool,
}

impl PgClaimRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_status(
        &self,
        user_id: &str,
        claim_id: &str,
    ) -> Result<Option<ClaimStatus>, RegistryError> {
        let row = sqlx::query(
            r#"
            SELECT status FROM claims
            WHERE user_id = $1 AND claim_id = $2
            "#,
        )
        .bind(user_id)
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| parse_status(r.get::<String, _>("status")))
            .transpose()
    }
}

fn parse_status(raw: String) -> Result<ClaimStatus, RegistryError> {
    raw.parse().map_err(|e: anyhow::Error| {
        RegistryError::Database(sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })
    })
}

/// Claim row
struct ClaimRow(Claim);

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ClaimRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<ClaimStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: e.into(),
            })?;

        Ok(ClaimRow(Claim {
            user_id: row.try_get("user_id")?,
            claim_id: row.try_get("claim_id")?,
            filename: row.try_get("filename")?,
            storage_location: row.try_get("storage_location")?,
            tags: row.try_get("tags")?,
            client: row.try_get("client")?,
            content_type: row.try_get("content_type")?,
            status,
            created_at: row.try_get("created_at")?,
            uploaded_at: row.try_get("uploaded_at")?,
            size_bytes: row.try_get("size_bytes")?,
            etag: row.try_get("etag")?,
            failure_reason: row.try_get("failure_reason")?,
        }))
    }
}

#[async_trait]
impl ClaimRegistry for PgClaimRegistry {
    #[tracing::instrument(skip(self, claim), fields(user_id = %claim.user_id, claim_id = %claim.claim_id))]
    async fn create_if_absent(&self, claim: &Claim) -> Result<(), RegistryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO claims (
                user_id, claim_id, filename, storage_location, tags, client,
                content_type, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, claim_id) DO NOTHING
            "#,
        )
        .bind(&claim.user_id)
        .bind(&claim.claim_id)
        .bind(&claim.filename)
        .bind(&claim.storage_location)
        .bind(&claim.tags)
        .bind(&claim.client)
        .bind(&claim.content_type)
        .bind(claim.status.to_string())
        .bind(claim.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::already_exists(&claim.user_id, &claim.claim_id));
        }

        tracing::debug!("Claim registered");
        Ok(())
    }

    #[tracing::instrument(skip(self, completion), fields(size_bytes = completion.size_bytes))]
    async fn complete_if_present(
        &self,
        user_id: &str,
        claim_id: &str,
        completion: &Completion,
    ) -> Result<(), RegistryError> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET status = 'COMPLETE',
                uploaded_at = $3,
                size_bytes = $4,
                etag = $5,
                updated_at = NOW()
            WHERE user_id = $1 AND claim_id = $2 AND status <> 'FAILED'
            "#,
        )
        .bind(user_id)
        .bind(claim_id)
        .bind(completion.uploaded_at)
        .bind(completion.size_bytes)
        .bind(&completion.etag)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing matched: either the record is missing or it already failed.
        match self.current_status(user_id, claim_id).await? {
            None => Err(RegistryError::not_found(user_id, claim_id)),
            Some(status) => Err(RegistryError::terminal(user_id, claim_id, status)),
        }
    }

    #[tracing::instrument(skip(self, reason))]
    async fn fail_if_pending(
        &self,
        user_id: &str,
        claim_id: &str,
        reason: &str,
    ) -> Result<ClaimStatus, RegistryError> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET status = 'FAILED', failure_reason = $3, updated_at = NOW()
            WHERE user_id = $1 AND claim_id = $2 AND status = 'PENDING'
            "#,
        )
        .bind(user_id)
        .bind(claim_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(ClaimStatus::Failed);
        }

        self.current_status(user_id, claim_id)
            .await?
            .ok_or_else(|| RegistryError::not_found(user_id, claim_id))
    }

    async fn get(&self, user_id: &str, claim_id: &str) -> Result<Option<Claim>, RegistryError> {
        let query = format!(
            "SELECT {} FROM claims WHERE user_id = $1 AND claim_id = $2",
            CLAIM_COLUMNS
        );
        let row = sqlx::query_as::<_, ClaimRow>(&query)
            .bind(user_id)
            .bind(claim_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|ClaimRow(claim)| claim))
    }

    async fn list_by_owner(&self, user_id: &str, limit: i64) -> Result<Vec<Claim>, RegistryError> {
        let query = format!(
            r#"SELECT {} FROM claims
            WHERE user_id = $1
            ORDER BY claim_id COLLATE "C" DESC
            LIMIT $2"#,
            CLAIM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&query)
            .bind(user_id)
            .bind(effective_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|ClaimRow(claim)| claim).collect())
    }
}
