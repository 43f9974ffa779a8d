//! Fixed values of the claim lifecycle.

/// The only MIME type an upload may be bound to.
pub const ACCEPTED_CONTENT_TYPE: &str = "text/plain";

/// Required filename extension, compared case-insensitively at intake.
pub const CLAIM_FILE_EXTENSION: &str = ".txt";

pub const MIN_TAGS: usize = 1;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 32;

/// Listing size used when the caller passes a non-positive limit.
pub const DEFAULT_LIST_LIMIT: i64 = 100;
/// Hard ceiling on a single listing page.
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Header carrying the caller identity when the dev bypass is enabled.
pub const DEV_USER_HEADER: &str = "x-user-sub";

/// Header the gateway uses to forward its authorizer context as JSON.
pub const DEFAULT_AUTHORIZER_CONTEXT_HEADER: &str = "x-authorizer-context";

/// Header carrying the shared secret on the notification webhook.
pub const NOTIFICATION_SECRET_HEADER: &str = "x-notification-secret";

pub const DEFAULT_SSE_ALGORITHM: &str = "aws:kms";

// Object metadata keys written at intake and read back at finalization.
pub const META_CLAIM_ID: &str = "claim_id";
pub const META_USER_ID: &str = "user_id";
pub const META_TAGS: &str = "tags";
pub const META_CLIENT: &str = "client";
