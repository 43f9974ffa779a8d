//! Object store setup

use anyhow::{Context, Result};
use claimdrop_core::Config;
use claimdrop_storage::{create_object_store, ObjectStore};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    tracing::info!("Initializing object store...");
    let store = create_object_store(config)
        .await
        .context("Failed to initialize object store")?;
    tracing::info!(
        backend = %store.backend_type(),
        bucket = %store.bucket(),
        "Object store initialized successfully"
    );
    Ok(store)
}
