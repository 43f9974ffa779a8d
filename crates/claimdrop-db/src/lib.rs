//! Claimdrop claim registry
//!
//! The registry is the only place claim state lives. Every mutation is a single
//! conditional write, so concurrent intakes and duplicate notifications are
//! resolved by the backend rather than by locks in the services.

pub mod db;

pub use db::{
    effective_limit, run_migrations, ClaimRegistry, MemoryClaimRegistry, PgClaimRegistry,
    RegistryError,
};
