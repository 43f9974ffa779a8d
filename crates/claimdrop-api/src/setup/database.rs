//! Claim registry setup

use anyhow::{Context, Result};
use claimdrop_core::{Config, RegistryBackend};
use claimdrop_db::{run_migrations, ClaimRegistry, MemoryClaimRegistry, PgClaimRegistry};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Connect the configured registry. Postgres gets a pool and pending migrations.
pub async fn setup_registry(config: &Config) -> Result<Arc<dyn ClaimRegistry>> {
    match config.registry_backend {
        RegistryBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres registry")?;

            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!(
                max_connections = config.db_max_connections,
                "Database connected successfully"
            );

            run_migrations(&pool).await?;
            Ok(Arc::new(PgClaimRegistry::new(pool)))
        }
        RegistryBackend::Memory => {
            tracing::warn!("Using in-memory claim registry; claims are lost on restart");
            Ok(Arc::new(MemoryClaimRegistry::new()))
        }
    }
}
