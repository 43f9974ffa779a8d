//! Configuration validation
//!
//! Hard errors come from `Config::validate`; this adds the startup warnings
//! that are worth a log line but not a refusal to start.

use anyhow::Result;
use claimdrop_core::{Config, ContentTypePolicy, StorageBackend};

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.notification_secret.is_none() {
        tracing::warn!("NOTIFICATION_SECRET not set - the notification route is unauthenticated");
    }

    if config.dev_bypass_auth {
        tracing::warn!("DEV_BYPASS_AUTH enabled - the x-user-sub header is trusted as identity");
    }

    if config.storage_backend == StorageBackend::Memory {
        tracing::warn!("Memory object store configured - presigned URLs are not usable by clients");
    }

    if config.content_type_policy == ContentTypePolicy::Reject {
        tracing::info!("Uploads with an unexpected content type will be marked FAILED");
    }

    Ok(())
}
