//! Session cookie authentication.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::AuthSession;
use crate::web::error::ApiError;
use crate::web::state::AppState;

/// Extractor for authenticated users.
///
/// Resolves the session cookie to a live session; rejects with 401
/// when the cookie is missing, unknown or expired.
#[derive(Debug, Clone)]
pub struct SessionUser(pub AuthSession);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.cookie_name)
            .ok_or_else(|| ApiError::unauthorized("Missing session"))?;

        let session = state.sessions.lock().await.get(&token).map_err(|e| {
            tracing::debug!("Session rejected: {}", e);
            ApiError::unauthorized("Invalid or expired session")
        })?;

        Ok(SessionUser(session))
    }
}

/// Read the session token from the request cookies.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}
