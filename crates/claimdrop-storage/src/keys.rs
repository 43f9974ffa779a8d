//! Storage location codec.
//!
//! Format: `user/{user_id}/{claim_id}.txt`. `decode(encode(u, c)) == Some((u, c))`
//! for every non-empty `u` and `c` that contain no `/` and no `..`; `encode`
//! refuses the rest.

use claimdrop_core::AppError;
use thiserror::Error;

const ROOT_SEGMENT: &str = "user";
const SEPARATOR: char = '/';
const SUFFIX: &str = ".txt";
const PARENT: &str = "..";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must not contain '/': {value}")]
    ContainsSeparator { field: &'static str, value: String },

    #[error("{field} must not contain '..': {value}")]
    ContainsParent { field: &'static str, value: String },
}

impl From<KeyError> for AppError {
    fn from(err: KeyError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Maps `(user_id, claim_id)` to a storage location and back.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec;

impl KeyCodec {
    pub fn encode(user_id: &str, claim_id: &str) -> Result<String, KeyError> {
        check_segment("user_id", user_id)?;
        check_segment("claim_id", claim_id)?;
        Ok(format!("{ROOT_SEGMENT}/{user_id}/{claim_id}{SUFFIX}"))
    }

    /// Returns `None` for any location this codec did not produce.
    pub fn decode(location: &str) -> Option<(String, String)> {
        let stem = location.strip_suffix(SUFFIX)?;
        let mut parts = stem.split(SEPARATOR);
        let (root, user_id, claim_id) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || root != ROOT_SEGMENT {
            return None;
        }
        if user_id.is_empty() || claim_id.is_empty() {
            return None;
        }
        Some((user_id.to_string(), claim_id.to_string()))
    }
}

fn check_segment(field: &'static str, value: &str) -> Result<(), KeyError> {
    if value.is_empty() {
        return Err(KeyError::Empty(field));
    }
    if value.contains(SEPARATOR) {
        return Err(KeyError::ContainsSeparator {
            field,
            value: value.to_string(),
        });
    }
    if value.contains(PARENT) {
        return Err(KeyError::ContainsParent {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Undo the form encoding S3 applies to object keys in event notifications
/// (`+` for space, percent escapes). Undecodable input is returned unchanged.
pub fn unescape_location(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, location = %raw, "Could not unescape storage location");
            raw.to_string()
        }
    }
}
