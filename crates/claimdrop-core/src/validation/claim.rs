//! Claim request validation
//!
//! Checks run in a fixed order and the first violation is reported:
//! filename, content type, tag count, each tag, client.

use regex::Regex;
use std::sync::OnceLock;

use crate::constants::{ACCEPTED_CONTENT_TYPE, CLAIM_FILE_EXTENSION, MAX_TAGS, MIN_TAGS};
use crate::error::AppError;
use crate::models::IntakeRequest;

/// Letters, digits, space, underscore and hyphen; 1 to 32 characters.
const TAG_PATTERN: &str = r"^[a-zA-Z0-9 _\-]{1,32}$";

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(TAG_PATTERN).expect("tag pattern is a valid regex"))
}

/// A claim request that passed validation, normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIntake {
    pub filename: String,
    pub content_type: String,
    pub tags: Vec<String>,
    pub client: String,
}

pub fn validate_tag(tag: &str) -> Result<(), AppError> {
    if tag_regex().is_match(tag) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("invalid tag: {}", tag)))
    }
}

/// Validate a claim request before any side effect happens.
pub fn validate_intake(req: &IntakeRequest) -> Result<ValidatedIntake, AppError> {
    // Checked as sent: trailing whitespace is part of the extension.
    let filename = req.filename.as_str();
    if !filename.to_lowercase().ends_with(CLAIM_FILE_EXTENSION) {
        return Err(AppError::InvalidInput(
            "only .txt files allowed".to_string(),
        ));
    }

    let content_type = match req.content_type.as_deref().map(str::trim) {
        None | Some("") => ACCEPTED_CONTENT_TYPE.to_string(),
        Some(ct) => ct.to_lowercase(),
    };
    if content_type != ACCEPTED_CONTENT_TYPE {
        return Err(AppError::InvalidInput(
            "Content-Type must be text/plain".to_string(),
        ));
    }

    if req.tags.len() < MIN_TAGS || req.tags.len() > MAX_TAGS {
        return Err(AppError::InvalidInput("provide 1..10 tags".to_string()));
    }
    for tag in &req.tags {
        validate_tag(tag)?;
    }

    let client = req.client.trim();
    if client.is_empty() {
        return Err(AppError::InvalidInput("client required".to_string()));
    }

    Ok(ValidatedIntake {
        filename: filename.to_string(),
        content_type,
        tags: req.tags.clone(),
        client: client.to_string(),
    })
}
