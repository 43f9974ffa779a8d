//! Application state shared by every handler

use claimdrop_core::Config;
use claimdrop_services::{ClaimListingService, FinalizationCoordinator, IntakeService};
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub intake: IntakeService,
    pub listing: ClaimListingService,
    pub finalizer: FinalizationCoordinator,
    /// Registry backend name, reported by the health check
    pub registry_backend: String,
    /// Object store backend name, reported by the health check
    pub storage_backend: String,
}

impl AppState {
    /// Deadline applied to each HTTP operation
    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout()
    }

    pub fn authorizer_header(&self) -> &str {
        &self.config.authorizer_context_header
    }

    pub fn notification_secret(&self) -> Option<&str> {
        self.config.notification_secret.as_deref()
    }
}
