//! Caller context extraction

pub mod context;

pub use context::CallerContext;
