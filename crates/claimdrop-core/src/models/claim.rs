use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use ulid::Ulid;
use utoipa::ToSchema;

/// Lifecycle state of a claim. Only moves forward: PENDING to COMPLETE or FAILED.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Pending,
    Complete,
    Failed,
}

impl ClaimStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ClaimStatus::Pending)
    }
}

impl Display for ClaimStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ClaimStatus::Pending => write!(f, "PENDING"),
            ClaimStatus::Complete => write!(f, "COMPLETE"),
            ClaimStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for ClaimStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ClaimStatus::Pending),
            "COMPLETE" => Ok(ClaimStatus::Complete),
            "FAILED" => Ok(ClaimStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid claim status: {}", s)),
        }
    }
}

/// Generate a fresh claim identifier. ULIDs sort lexicographically by creation time.
pub fn new_claim_id() -> String {
    Ulid::new().to_string()
}

/// A user's claim on an upload slot, keyed by `(user_id, claim_id)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claim {
    pub user_id: String,
    pub claim_id: String,
    pub filename: String,
    pub storage_location: String,
    pub tags: Vec<String>,
    pub client: String,
    pub content_type: String,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub size_bytes: Option<i64>,
    pub etag: Option<String>,
    pub failure_reason: Option<String>,
}

impl Claim {
    /// A freshly registered claim awaiting its upload.
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        user_id: impl Into<String>,
        claim_id: impl Into<String>,
        filename: impl Into<String>,
        storage_location: impl Into<String>,
        tags: Vec<String>,
        client: impl Into<String>,
        content_type: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            claim_id: claim_id.into(),
            filename: filename.into(),
            storage_location: storage_location.into(),
            tags,
            client: client.into(),
            content_type: content_type.into(),
            status: ClaimStatus::Pending,
            created_at,
            uploaded_at: None,
            size_bytes: None,
            etag: None,
            failure_reason: None,
        }
    }
}

/// Upload details recorded when a claim completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub size_bytes: i64,
    pub etag: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Claim as returned by listing and lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ClaimSummary {
    pub claim_id: String,
    pub filename: String,
    pub tags: Vec<String>,
    pub client: String,
    pub status: ClaimStatus,
    pub storage_location: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl From<Claim> for ClaimSummary {
    fn from(claim: Claim) -> Self {
        Self {
            claim_id: claim.claim_id,
            filename: claim.filename,
            tags: claim.tags,
            client: claim.client,
            status: claim.status,
            storage_location: claim.storage_location,
            created_at: claim.created_at,
            uploaded_at: claim.uploaded_at,
            size_bytes: claim.size_bytes,
            etag: claim.etag,
            failure_reason: claim.failure_reason,
        }
    }
}
