//! HTTP error body
//!
//! `IntoResponse` for `AppError` lives in claimdrop-api: the orphan rule keeps
//! it out of library crates that own neither the trait nor the type.

use serde::Serialize;
use utoipa::ToSchema;

/// Error body returned by every endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}
