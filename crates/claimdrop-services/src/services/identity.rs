//! Caller identity resolution.
//!
//! A request can arrive with identity in several places depending on which
//! gateway authorizer handled it. Strategies are tried in a fixed order and
//! the first non-empty result wins:
//!
//! 1. dev bypass header (only when enabled at construction)
//! 2. authorizer `claims.sub`, then a flat top-level `sub`
//! 3. authorizer `principalId`
//! 4. `sub` from the payload of an unverified bearer token
//!
//! Token signatures are not checked here; the gateway is responsible for that.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use claimdrop_core::constants::DEV_USER_HEADER;
use claimdrop_core::AppError;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use serde_json::{Map, Value};
use std::fmt;

const BEARER_PREFIX: &str = "bearer ";

/// The `claims` block of an authorizer context, in either shape gateways emit it
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizerClaims {
    Nested(Map<String, Value>),
    /// JSON object serialized into a string
    Stringified(String),
}

impl AuthorizerClaims {
    fn sub(&self) -> Option<String> {
        match self {
            AuthorizerClaims::Nested(map) => string_field(map, "sub"),
            AuthorizerClaims::Stringified(raw) => {
                let map: Map<String, Value> = serde_json::from_str(raw).ok()?;
                string_field(&map, "sub")
            }
        }
    }
}

/// Identity data a gateway authorizer attached to the request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizerContext {
    pub claims: Option<AuthorizerClaims>,
    /// Top-level string entries other than `claims`
    pub flat: Map<String, Value>,
    pub principal_id: Option<String>,
}

impl AuthorizerContext {
    /// Classify a raw authorizer mapping. Returns `None` unless it is a JSON object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut context = AuthorizerContext::default();

        for (key, value) in object {
            match (key.as_str(), value) {
                ("claims", Value::Object(map)) => {
                    context.claims = Some(AuthorizerClaims::Nested(map.clone()));
                }
                ("claims", Value::String(raw)) => {
                    context.claims = Some(AuthorizerClaims::Stringified(raw.clone()));
                }
                ("claims", _) => {}
                ("principalId", Value::String(id)) => {
                    context.principal_id = Some(id.clone());
                }
                (_, Value::String(_)) => {
                    context.flat.insert(key.clone(), value.clone());
                }
                _ => {}
            }
        }

        Some(context)
    }

    fn claims_sub(&self) -> Option<String> {
        self.claims.as_ref().and_then(AuthorizerClaims::sub)
    }

    fn flat_sub(&self) -> Option<String> {
        string_field(&self.flat, "sub")
    }

    fn principal(&self) -> Option<String> {
        non_blank(self.principal_id.as_deref())
    }
}

/// Everything identity resolution may look at
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub headers: HeaderMap,
    pub authorizer: Option<AuthorizerContext>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, authorizer: Option<AuthorizerContext>) -> Self {
        Self {
            headers,
            authorizer,
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    DevBypass,
    AuthorizerClaims,
    AuthorizerFlat,
    Principal,
    UnverifiedBearer,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentitySource::DevBypass => "dev_bypass",
            IdentitySource::AuthorizerClaims => "authorizer_claims",
            IdentitySource::AuthorizerFlat => "authorizer_flat",
            IdentitySource::Principal => "principal",
            IdentitySource::UnverifiedBearer => "unverified_bearer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user_id: String,
    pub source: IdentitySource,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver {
    dev_bypass_enabled: bool,
}

impl IdentityResolver {
    pub fn new(dev_bypass_enabled: bool) -> Self {
        Self { dev_bypass_enabled }
    }

    pub fn dev_bypass_enabled(&self) -> bool {
        self.dev_bypass_enabled
    }

    pub fn resolve(&self, ctx: &RequestContext) -> Result<ResolvedIdentity, AppError> {
        let resolved = self
            .dev_bypass(ctx)
            .map(|id| (id, IdentitySource::DevBypass))
            .or_else(|| {
                let authorizer = ctx.authorizer.as_ref()?;
                authorizer
                    .claims_sub()
                    .map(|id| (id, IdentitySource::AuthorizerClaims))
                    .or_else(|| {
                        authorizer
                            .flat_sub()
                            .map(|id| (id, IdentitySource::AuthorizerFlat))
                    })
                    .or_else(|| {
                        authorizer
                            .principal()
                            .map(|id| (id, IdentitySource::Principal))
                    })
            })
            .or_else(|| {
                bearer_sub(ctx.header(AUTHORIZATION.as_str()))
                    .map(|id| (id, IdentitySource::UnverifiedBearer))
            });

        match resolved {
            Some((user_id, source)) => {
                tracing::debug!(user_id = %user_id, source = %source, "Caller identity resolved");
                Ok(ResolvedIdentity { user_id, source })
            }
            None => Err(AppError::Unauthorized(
                "missing or invalid user".to_string(),
            )),
        }
    }

    fn dev_bypass(&self, ctx: &RequestContext) -> Option<String> {
        if !self.dev_bypass_enabled {
            return None;
        }
        non_blank(ctx.header(DEV_USER_HEADER))
    }
}

/// `sub` from the payload of `Bearer <header>.<payload>.<signature>`, unverified.
fn bearer_sub(authorization: Option<&str>) -> Option<String> {
    let value = authorization?.trim();
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = value[BEARER_PREFIX.len()..].trim();

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .ok()?;
    let claims: Map<String, Value> = serde_json::from_slice(&payload).ok()?;
    string_field(&claims, "sub")
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    non_blank(map.get(key).and_then(Value::as_str))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn token_with(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("{}.{}.c2lnbmF0dXJl", header, body)
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn authorizer(value: Value) -> Option<AuthorizerContext> {
        AuthorizerContext::from_json(&value)
    }

    #[test]
    fn test_nested_claims() {
        let ctx = RequestContext::new(
            HeaderMap::new(),
            authorizer(json!({"claims": {"sub": "user-1", "email": "a@b.c"}})),
        );
        let resolved = IdentityResolver::new(false).resolve(&ctx).unwrap();
        assert_eq!(resolved.user_id, "user-1");
        assert_eq!(resolved.source, IdentitySource::AuthorizerClaims);
    }

    #[test]
    fn test_stringified_claims() {
        let ctx = RequestContext::new(
            HeaderMap::new(),
            authorizer(json!({"claims": "{\"sub\":\"user-2\"}"})),
        );
        assert_eq!(
            IdentityResolver::new(false).resolve(&ctx).unwrap().user_id,
            "user-2"
        );
    }

    #[test]
    fn test_flat_sub_then_principal() {
        let ctx = RequestContext::new(
            HeaderMap::new(),
            authorizer(json!({"sub": " user-3 ", "principalId": "p-1"})),
        );
        let resolved = IdentityResolver::new(false).resolve(&ctx).unwrap();
        assert_eq!(resolved.user_id, "user-3");
        assert_eq!(resolved.source, IdentitySource::AuthorizerFlat);

        let ctx = RequestContext::new(
            HeaderMap::new(),
            authorizer(json!({"claims": "not json", "principalId": "p-1"})),
        );
        let resolved = IdentityResolver::new(false).resolve(&ctx).unwrap();
        assert_eq!(resolved.user_id, "p-1");
        assert_eq!(resolved.source, IdentitySource::Principal);
    }

    #[test]
    fn test_unverified_bearer_fallback() {
        let token = token_with(&json!({"sub": "user-4", "exp": 1}));
        for scheme in ["Bearer", "bearer", "BEARER"] {
            let ctx = RequestContext::new(
                headers(&[("authorization", &format!("{} {}", scheme, token))]),
                None,
            );
            let resolved = IdentityResolver::new(false).resolve(&ctx).unwrap();
            assert_eq!(resolved.user_id, "user-4");
            assert_eq!(resolved.source, IdentitySource::UnverifiedBearer);
        }
    }

    #[test]
    fn test_malformed_bearer_is_unauthorized() {
        let resolver = IdentityResolver::new(false);
        for value in [
            "Bearer",
            "Bearer a.b",
            "Bearer a.b.c.d",
            "Bearer x.!!!.y",
            "Token a.b.c",
        ] {
            let ctx = RequestContext::new(headers(&[("authorization", value)]), None);
            assert!(
                matches!(resolver.resolve(&ctx), Err(AppError::Unauthorized(_))),
                "{value:?} should not resolve"
            );
        }

        let no_sub = token_with(&json!({"email": "a@b.c"}));
        let ctx = RequestContext::new(
            headers(&[("authorization", &format!("Bearer {}", no_sub))]),
            None,
        );
        assert!(resolver.resolve(&ctx).is_err());
    }

    #[test]
    fn test_dev_bypass_wins_only_when_enabled() {
        let token = token_with(&json!({"sub": "from-token"}));
        let ctx = RequestContext::new(
            headers(&[
                ("x-user-sub", "  dev-user "),
                ("authorization", &format!("Bearer {}", token)),
            ]),
            authorizer(json!({"claims": {"sub": "from-claims"}})),
        );

        let enabled = IdentityResolver::new(true).resolve(&ctx).unwrap();
        assert_eq!(enabled.user_id, "dev-user");
        assert_eq!(enabled.source, IdentitySource::DevBypass);

        let disabled = IdentityResolver::new(false).resolve(&ctx).unwrap();
        assert_eq!(disabled.user_id, "from-claims");
    }

    #[test]
    fn test_blank_values_fall_through() {
        let token = token_with(&json!({"sub": "from-token"}));
        let ctx = RequestContext::new(
            headers(&[
                ("x-user-sub", "   "),
                ("authorization", &format!("Bearer {}", token)),
            ]),
            authorizer(json!({"claims": {"sub": ""}, "principalId": " "})),
        );
        let resolved = IdentityResolver::new(true).resolve(&ctx).unwrap();
        assert_eq!(resolved.user_id, "from-token");
    }

    #[test]
    fn test_nothing_resolves() {
        let err = IdentityResolver::new(true)
            .resolve(&RequestContext::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized: missing or invalid user");
    }

    #[test]
    fn test_non_object_authorizer_is_ignored() {
        assert!(AuthorizerContext::from_json(&json!("sub")).is_none());
        assert!(AuthorizerContext::from_json(&json!([1, 2])).is_none());
    }
}
