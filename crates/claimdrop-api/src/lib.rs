//! Claimdrop API Library
//!
//! HTTP handlers, request extractors, error rendering and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;

pub mod auth;
pub mod error;
pub mod state;

pub use claimdrop_infra::ErrorResponse;
