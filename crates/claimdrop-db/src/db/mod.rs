//! Registry implementations
//!
//! `claims/` holds the `ClaimRegistry` trait with a Postgres implementation and
//! an in-memory one for tests and local development.

pub mod claims;

pub use claims::{
    effective_limit, ClaimRegistry, MemoryClaimRegistry, PgClaimRegistry, RegistryError,
};

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::path::Path;

/// Apply pending migrations from the workspace `migrations/` directory
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
