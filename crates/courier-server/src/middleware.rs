//! Caller identity extraction.
//!
//! An upstream gateway authenticates every request and attaches the
//! verified caller as the `X-User` header. This middleware is the only
//! place that header is read: it fails closed, so no handler behind it
//! ever runs without an identity in the request extensions.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use serde::Deserialize;

use crate::error::ApiError;

/// Header carrying the verified caller identity, set by the gateway.
pub const USER_HEADER: &str = "X-User";

/// The caller's identity: an opaque string established upstream.
/// Consumed for ownership checks, never produced or validated here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity(pub String);

/// The gateway's JSON header shape. Only `user_name` matters here.
#[derive(Deserialize)]
struct GatewayUser {
    #[serde(rename = "userName")]
    user_name: String,
}

/// Parses an `X-User` header value into an identity.
///
/// Accepts the gateway's JSON form (`{"id": ..., "userName": "..."}`)
/// or a bare opaque string. Empty values are rejected.
fn parse_identity(raw: &str) -> Option<Identity> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(user) = serde_json::from_str::<GatewayUser>(trimmed) {
        if user.user_name.is_empty() {
            return None;
        }
        return Some(Identity(user.user_name));
    }

    Some(Identity(trimmed.to_string()))
}

/// Middleware gating every versioned route on a verified identity.
///
/// Missing, unreadable, or empty `X-User` → 401; nothing downstream of
/// this middleware runs.
pub async fn identity_middleware(
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = req
        .headers()
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_identity)
        .ok_or_else(|| ApiError::Unauthenticated("no X-User header provided".to_string()))?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
