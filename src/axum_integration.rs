//! Axum integration for the gateway
//!
//! - Bearer token extraction from request headers
//! - `FromRequestParts` extractor for the profile resolved by [`RequireRole`](crate::gateway::RequireRole)
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{routing::get, Router};
//! use rolegate::axum_integration::CurrentProfile;
//!
//! async fn protected_handler(profile: CurrentProfile) -> String {
//!     format!("Hello, {}!", profile.subject_id)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .layer(RequireRole::new(gateway, "admin"));
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
};
use std::ops::Deref;
use std::sync::Arc;

use crate::profile::Profile;

/// Extract a Bearer token from the Authorization header.
///
/// The scheme is matched case-insensitively. Other schemes, non-ASCII header
/// values and empty tokens all yield `None`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token.to_string())
}

/// Profile of the caller, inserted into request extensions once authorized
#[derive(Debug, Clone)]
pub struct CurrentProfile(pub Arc<Profile>);

impl Deref for CurrentProfile {
    type Target = Profile;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentProfile
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentProfile>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token_valid() {
        let token = extract_bearer_token(&headers_with("Bearer my-secret-token"));
        assert_eq!(token, Some("my-secret-token".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_scheme_case() {
        let token = extract_bearer_token(&headers_with("bearer abc.def.ghi"));
        assert_eq!(token, Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_extract_bearer_token_missing() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        assert_eq!(extract_bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
    }

    #[test]
    fn test_extract_bearer_token_malformed() {
        assert_eq!(extract_bearer_token(&headers_with("Bearertoken")), None);
        assert_eq!(extract_bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer_token(&headers_with("Bearer two parts")), None);
    }

    #[tokio::test]
    async fn test_current_profile_extractor() {
        let profile = Arc::new(Profile::from_json(serde_json::json!({ "user_id": "u1" })).unwrap());
        let mut request = axum::http::Request::builder().body(()).unwrap();
        request.extensions_mut().insert(CurrentProfile(profile));
        let (mut parts, _) = request.into_parts();

        let extracted = CurrentProfile::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted.subject_id, "u1");

        let (mut empty, _) = axum::http::Request::builder().body(()).unwrap().into_parts();
        let rejection = CurrentProfile::from_request_parts(&mut empty, &()).await.unwrap_err();
        assert_eq!(rejection, StatusCode::UNAUTHORIZED);
    }
}
