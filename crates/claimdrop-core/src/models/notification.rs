use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The object store reports that an object now exists at `location_ref` in `bucket_ref`.
/// `location_ref` may still be URL-escaped the way S3 event notifications deliver keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UploadNotification {
    pub bucket_ref: String,
    pub location_ref: String,
}

impl UploadNotification {
    pub fn new(bucket_ref: impl Into<String>, location_ref: impl Into<String>) -> Self {
        Self {
            bucket_ref: bucket_ref.into(),
            location_ref: location_ref.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
}

/// Accepted notification payloads: a batch, an S3 event document, or one notification
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NotificationEnvelope {
    Batch {
        notifications: Vec<UploadNotification>,
    },
    S3Event {
        #[serde(rename = "Records")]
        records: Vec<S3EventRecord>,
    },
    Single(UploadNotification),
}

impl NotificationEnvelope {
    pub fn into_notifications(self) -> Vec<UploadNotification> {
        match self {
            NotificationEnvelope::Batch { notifications } => notifications,
            NotificationEnvelope::S3Event { records } => records
                .into_iter()
                .map(|r| UploadNotification::new(r.s3.bucket.name, r.s3.object.key))
                .collect(),
            NotificationEnvelope::Single(n) => vec![n],
        }
    }
}

/// Result of finalizing one notification
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalizeOutcome {
    Completed { user_id: String, claim_id: String },
    Failed {
        user_id: String,
        claim_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
pub struct NotificationFailure {
    pub location_ref: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, ToSchema)]
pub struct BatchReport {
    pub processed: usize,
    pub finalized: usize,
    pub failed: usize,
    pub failures: Vec<NotificationFailure>,
}
