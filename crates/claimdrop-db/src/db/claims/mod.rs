mod memory;
mod postgres;

pub use memory::MemoryClaimRegistry;
pub use postgres::PgClaimRegistry;

use async_trait::async_trait;
use claimdrop_core::constants::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use claimdrop_core::models::{Claim, ClaimStatus, Completion};
use claimdrop_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("claim already exists: {user_id}/{claim_id}")]
    AlreadyExists { user_id: String, claim_id: String },

    #[error("claim not found: {user_id}/{claim_id}")]
    NotFound { user_id: String, claim_id: String },

    /// The record is in a state the requested transition cannot leave
    #[error("claim {user_id}/{claim_id} is {status}")]
    TerminalState {
        user_id: String,
        claim_id: String,
        status: ClaimStatus,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RegistryError {
    pub(crate) fn already_exists(user_id: &str, claim_id: &str) -> Self {
        RegistryError::AlreadyExists {
            user_id: user_id.to_string(),
            claim_id: claim_id.to_string(),
        }
    }

    pub(crate) fn not_found(user_id: &str, claim_id: &str) -> Self {
        RegistryError::NotFound {
            user_id: user_id.to_string(),
            claim_id: claim_id.to_string(),
        }
    }

    pub(crate) fn terminal(user_id: &str, claim_id: &str, status: ClaimStatus) -> Self {
        RegistryError::TerminalState {
            user_id: user_id.to_string(),
            claim_id: claim_id.to_string(),
            status,
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyExists { .. } => {
                AppError::Conflict("claim already exists".to_string())
            }
            RegistryError::NotFound { .. } => AppError::NotFound("claim not found".to_string()),
            RegistryError::TerminalState { status, .. } => {
                AppError::Conflict(format!("claim is already {}", status))
            }
            RegistryError::Database(e) => AppError::Database(e),
        }
    }
}

/// Clamp a caller-supplied page size: non-positive means the default, and no
/// page is larger than the ceiling.
pub fn effective_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_LIST_LIMIT
    } else {
        limit.min(MAX_LIST_LIMIT)
    }
}

/// Durable claim state with conditional writes.
///
/// Implementations must make each method a single atomic step with respect to
/// the record it touches; callers never hold locks across calls.
#[async_trait]
pub trait ClaimRegistry: Send + Sync {
    /// Insert `claim` unless `(user_id, claim_id)` already exists, in which case
    /// nothing is written and `AlreadyExists` is returned.
    async fn create_if_absent(&self, claim: &Claim) -> Result<(), RegistryError>;

    /// Set status COMPLETE with the upload details. Re-applying to a COMPLETE
    /// record succeeds. `NotFound` if absent, `TerminalState` if FAILED.
    async fn complete_if_present(
        &self,
        user_id: &str,
        claim_id: &str,
        completion: &Completion,
    ) -> Result<(), RegistryError>;

    /// Set status FAILED if the record is still PENDING. Returns the status the
    /// record has afterwards; a terminal record is left untouched.
    async fn fail_if_pending(
        &self,
        user_id: &str,
        claim_id: &str,
        reason: &str,
    ) -> Result<ClaimStatus, RegistryError>;

    async fn get(&self, user_id: &str, claim_id: &str) -> Result<Option<Claim>, RegistryError>;

    /// The owner's claims, newest first, at most `effective_limit(limit)` of them.
    async fn list_by_owner(&self, user_id: &str, limit: i64) -> Result<Vec<Claim>, RegistryError>;
}
