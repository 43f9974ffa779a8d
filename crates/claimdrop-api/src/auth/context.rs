use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use claimdrop_services::{AuthorizerContext, RequestContext};
use std::convert::Infallible;
use std::sync::Arc;

/// The identity inputs of a request: its headers plus the authorizer context
/// the gateway forwards as a JSON header.
///
/// Extraction never fails; a missing or malformed authorizer header just
/// leaves less for `IdentityResolver` to work with.
#[derive(Debug, Clone)]
pub struct CallerContext(pub RequestContext);

fn parse_authorizer(raw: &str) -> Option<AuthorizerContext> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => AuthorizerContext::from_json(&value),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed authorizer context header");
            None
        }
    }
}

impl FromRequestParts<Arc<AppState>> for CallerContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let authorizer = parts
            .headers
            .get(state.authorizer_header())
            .and_then(|v| v.to_str().ok())
            .and_then(parse_authorizer);

        Ok(CallerContext(RequestContext::new(
            parts.headers.clone(),
            authorizer,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorizer() {
        assert!(parse_authorizer(r#"{"claims": {"sub": "u1"}}"#).is_some());
        assert!(parse_authorizer("not json").is_none());
        assert!(parse_authorizer("[1, 2]").is_none());
    }
}
