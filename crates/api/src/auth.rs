//! Bearer-token extractor guarding protected routes.

use std::sync::Arc;

use access::Claims;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Proof that the request carried a valid bearer token.
///
/// Add it as the first handler argument; validation runs before the body is
/// read or the store is touched.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

impl Authenticated {
    /// The token's subject (the customer's email).
    pub fn subject(&self) -> &str {
        &self.0.sub
    }
}

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            metrics::counter!("auth_rejections_total").increment(1);
            ApiError::Unauthorized("missing bearer token".to_string())
        })?;

        let claims = state.authority.validate(token)?;
        tracing::debug!(subject = %claims.sub, "request authenticated");
        Ok(Authenticated(claims))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
