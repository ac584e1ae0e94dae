//! Authentication extractors.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::error::AppError;
use crate::slack::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::state::AppState;

/// Extractor that requires `Authorization: Bearer <RELAY_SHARED_SECRET>`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(_auth: RequireSharedSecret) -> impl IntoResponse {
///     "ok"
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireSharedSecret;

impl FromRequestParts<AppState> for RequireSharedSecret {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        if !state.config().shared_secret_matches(presented) {
            warn!(path = %parts.uri.path(), "Rejected request with wrong shared secret");
            return Err(AppError::Unauthorized("Invalid bearer token".to_string()));
        }

        Ok(Self)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Raw body of a Slack callback, verified against the signing secret when
/// one is configured.
#[derive(Debug, Clone)]
pub struct VerifiedSlackBody(pub String);

impl FromRequest<AppState> for VerifiedSlackBody {
    type Rejection = AppError;

    async fn from_request(request: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let headers = request.headers().clone();
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let body = String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::BadRequest("Body is not UTF-8".to_string()))?;

        if let Some(verifier) = state.signature_verifier() {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            };
            verifier
                .verify(&header(TIMESTAMP_HEADER), &body, &header(SIGNATURE_HEADER))
                .inspect_err(|e| warn!(error = %e, "Rejected Slack request"))?;
        }

        Ok(Self(body))
    }
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hell"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  abc123 "));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
