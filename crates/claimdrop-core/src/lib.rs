//! Claimdrop Core Library
//!
//! Domain models, error types, configuration and request validation shared by
//! every claimdrop component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, ContentTypePolicy, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    Claim, ClaimStatus, ClaimSummary, IntakeRequest, IntakeResponse, UploadCredential,
    UploadNotification,
};
pub use storage_types::{RegistryBackend, StorageBackend};
