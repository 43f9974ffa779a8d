//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use claimdrop_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration, before anything connects
    validation::validate_config(&config).context("Configuration validation failed")?;

    claimdrop_infra::init_telemetry(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let registry = database::setup_registry(&config).await?;
    let store = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, registry, store);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
