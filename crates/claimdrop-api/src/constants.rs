//! API constants

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

pub const API_VERSION: &str = "v0";

/// Prefix every claim route is mounted under
pub const API_PREFIX: &str = "/api/v0";

pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Intake bodies are tiny; notification batches are the largest payloads.
pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;
