//! Configuration module
//!
//! Process configuration for the claimdrop API: HTTP server, claim registry,
//! object store, identity resolution and finalization policy. Values come from
//! the environment (a `.env` file is honoured) and are checked by `validate()`
//! before anything is wired.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_AUTHORIZER_CONTEXT_HEADER, DEFAULT_LIST_LIMIT, DEFAULT_SSE_ALGORITHM, MAX_LIST_LIMIT,
};
use crate::storage_types::{RegistryBackend, StorageBackend};

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const PRESIGN_TTL_SECS: u64 = 300;
/// S3 rejects presigned URLs valid for longer than seven days.
const MAX_PRESIGN_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REGION: &str = "us-east-1";

/// What finalization does when an uploaded object's content type is not the accepted one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentTypePolicy {
    /// Log the anomaly and complete the claim anyway
    #[default]
    Warn,
    /// Log the anomaly and move the claim to FAILED
    Reject,
}

impl FromStr for ContentTypePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warn" => Ok(ContentTypePolicy::Warn),
            "reject" => Ok(ContentTypePolicy::Reject),
            _ => Err(anyhow::anyhow!("Invalid content type policy: {}", s)),
        }
    }
}

impl Display for ContentTypePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ContentTypePolicy::Warn => write!(f, "warn"),
            ContentTypePolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub log_format: LogFormat,
    // Claim registry
    pub registry_backend: RegistryBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Object store
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, LocalStack)
    pub s3_sse: String,
    pub presign_ttl_secs: u64,
    // Identity
    pub dev_bypass_auth: bool,
    pub authorizer_context_header: String,
    // Finalization
    pub content_type_policy: ContentTypePolicy,
    pub notification_secret: Option<String>,
    // Request handling
    pub list_default_limit: i64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            log_format: LogFormat::Pretty,
            registry_backend: RegistryBackend::Memory,
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            storage_backend: StorageBackend::Memory,
            s3_bucket: None,
            s3_region: DEFAULT_REGION.to_string(),
            s3_endpoint: None,
            s3_sse: DEFAULT_SSE_ALGORITHM.to_string(),
            presign_ttl_secs: PRESIGN_TTL_SECS,
            dev_bypass_auth: false,
            authorizer_context_header: DEFAULT_AUTHORIZER_CONTEXT_HEADER.to_string(),
            content_type_policy: ContentTypePolicy::Warn,
            notification_secret: None,
            list_default_limit: DEFAULT_LIST_LIMIT,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .or_else(|_| env::var("FRONTEND_ORIGIN"))
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env_non_empty("DATABASE_URL");
        let registry_backend = match env_non_empty("REGISTRY_BACKEND") {
            Some(raw) => raw.parse()?,
            None if database_url.is_some() => RegistryBackend::Postgres,
            None => RegistryBackend::Memory,
        };

        let storage_backend = match env_non_empty("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::S3,
        };

        let content_type_policy = match env_non_empty("CONTENT_TYPE_POLICY") {
            Some(raw) => raw.parse()?,
            None => ContentTypePolicy::default(),
        };

        let log_format = match env_non_empty("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .unwrap_or(SERVER_PORT),
            environment,
            cors_origins,
            log_format,
            registry_backend,
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env_non_empty("S3_BUCKET"),
            s3_region: env_non_empty("S3_REGION")
                .or_else(|| env_non_empty("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            s3_endpoint: env_non_empty("S3_ENDPOINT").or_else(|| env_non_empty("AWS_ENDPOINT_URL")),
            s3_sse: env_non_empty("S3_SSE").unwrap_or_else(|| DEFAULT_SSE_ALGORITHM.to_string()),
            presign_ttl_secs: env::var("PRESIGN_TTL_SECONDS")
                .unwrap_or_else(|_| PRESIGN_TTL_SECS.to_string())
                .parse()
                .unwrap_or(PRESIGN_TTL_SECS),
            dev_bypass_auth: env_flag("DEV_BYPASS_AUTH"),
            authorizer_context_header: env_non_empty("AUTHORIZER_CONTEXT_HEADER")
                .map(|h| h.to_lowercase())
                .unwrap_or_else(|| DEFAULT_AUTHORIZER_CONTEXT_HEADER.to_string()),
            content_type_policy,
            notification_secret: env_non_empty("NOTIFICATION_SECRET"),
            list_default_limit: env::var("LIST_DEFAULT_LIMIT")
                .unwrap_or_else(|_| DEFAULT_LIST_LIMIT.to_string())
                .parse()
                .unwrap_or(DEFAULT_LIST_LIMIT),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() {
            if self.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
            if self.dev_bypass_auth {
                return Err(anyhow::anyhow!(
                    "DEV_BYPASS_AUTH cannot be enabled in production"
                ));
            }
            if self.notification_secret.is_none() {
                return Err(anyhow::anyhow!(
                    "NOTIFICATION_SECRET must be set in production"
                ));
            }
        }

        match self.registry_backend {
            RegistryBackend::Postgres => {
                let url = self.database_url.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL must be set when using the postgres registry")
                })?;
                if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ));
                }
            }
            RegistryBackend::Memory => {
                if self.is_production() {
                    return Err(anyhow::anyhow!(
                        "The memory registry cannot be used in production"
                    ));
                }
            }
        }

        if self.storage_backend == StorageBackend::S3 && self.s3_bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when using S3 storage backend"
            ));
        }

        if self.presign_ttl_secs == 0 || self.presign_ttl_secs > MAX_PRESIGN_TTL_SECS {
            return Err(anyhow::anyhow!(
                "PRESIGN_TTL_SECONDS must be between 1 and {}",
                MAX_PRESIGN_TTL_SECS
            ));
        }

        if self.list_default_limit <= 0 || self.list_default_limit > MAX_LIST_LIMIT {
            return Err(anyhow::anyhow!(
                "LIST_DEFAULT_LIMIT must be between 1 and {}",
                MAX_LIST_LIMIT
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be positive"));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }
}
