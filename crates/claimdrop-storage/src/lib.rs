//! Claimdrop Storage Library
//!
//! Object store boundary for claim uploads: presigning a PUT bound to a fixed
//! set of headers, and reading an uploaded object's metadata back.
//!
//! # Storage location format
//!
//! Every claim object lives at `user/{user_id}/{claim_id}.txt`. The mapping is
//! owned by [`KeyCodec`]; no other code formats or parses locations.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use claimdrop_core::StorageBackend;
pub use factory::create_object_store;
pub use keys::{unescape_location, KeyCodec, KeyError};
#[cfg(feature = "storage-memory")]
pub use memory::MemoryObjectStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3ObjectStore;
pub use traits::{
    ObjectMetadata, ObjectStore, PresignedPut, PutObjectSpec, StorageError, StorageResult,
};
