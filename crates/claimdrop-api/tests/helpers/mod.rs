//! Test helpers: build the router over the memory registry and memory object store.
//!
//! Run from workspace root: `cargo test -p claimdrop-api`.

#![allow(dead_code)]

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use claimdrop_api::constants;
use claimdrop_api::setup::{routes, services};
use claimdrop_core::{Claim, Config, ContentTypePolicy};
use claimdrop_db::{ClaimRegistry, MemoryClaimRegistry};
use claimdrop_storage::MemoryObjectStore;
use std::sync::Arc;

pub const TEST_BUCKET: &str = "claims-test";
pub const TEST_SECRET: &str = "notify-secret";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus handles on the backends behind it.
pub struct TestApp {
    pub server: TestServer,
    pub registry: Arc<MemoryClaimRegistry>,
    pub store: MemoryObjectStore,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub async fn registry_claim(&self, user_id: &str, claim_id: &str) -> Claim {
        self.registry
            .get(user_id, claim_id)
            .await
            .expect("Registry lookup failed")
            .expect("Claim not found")
    }

    /// Simulate the client's direct upload to the presigned location.
    pub fn upload(&self, location: &str, content_type: &str, body: &[u8], user_id: &str, claim_id: &str) {
        self.store.put_object(
            TEST_BUCKET,
            location,
            body,
            Some(content_type),
            [
                ("user_id".to_string(), user_id.to_string()),
                ("claim_id".to_string(), claim_id.to_string()),
            ],
        );
    }
}

pub fn test_config() -> Config {
    Config {
        dev_bypass_auth: true,
        s3_bucket: Some(TEST_BUCKET.to_string()),
        ..Config::default()
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config())
}

pub fn setup_test_app_with(config: Config) -> TestApp {
    let registry = Arc::new(MemoryClaimRegistry::new());
    let store = MemoryObjectStore::new(TEST_BUCKET);

    let state = services::initialize_services(&config, registry.clone(), Arc::new(store.clone()));
    let router = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        registry,
        store,
    }
}

pub fn reject_policy_config() -> Config {
    Config {
        content_type_policy: ContentTypePolicy::Reject,
        ..test_config()
    }
}

pub fn secret_config() -> Config {
    Config {
        notification_secret: Some(TEST_SECRET.to_string()),
        ..test_config()
    }
}

/// Dev bypass identity header
pub fn user_header(user_id: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-sub"),
        HeaderValue::from_str(user_id).expect("Invalid header value"),
    )
}
