//! Validation modules

pub mod claim;

pub use claim::{validate_intake, validate_tag, ValidatedIntake};
