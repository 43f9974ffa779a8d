use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

/// Body of a claim request. Missing fields deserialize as empty so that
/// validation, not the JSON decoder, reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct IntakeRequest {
    pub filename: String,
    pub tags: Vec<String>,
    pub client: String,
    #[serde(alias = "contentType")]
    pub content_type: Option<String>,
}

/// Time-bounded permission to write one object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct UploadCredential {
    pub url: String,
    pub method: String,
    /// Seconds the URL stays valid after issue
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
    pub content_type: String,
    /// Headers the client must send verbatim with the upload
    pub required_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntakeResponse {
    pub claim_id: String,
    pub storage_location: String,
    pub upload_credential: UploadCredential,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListClaimsQuery {
    /// Page size; missing or non-positive means the configured default
    pub limit: Option<i64>,
}
