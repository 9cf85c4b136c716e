//! Authentication handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::{authenticate, register as register_user, AuthSession};
use crate::db::UserRepository;
use crate::web::dto::{ApiResponse, LoginRequest, RegisterRequest, UserInfo, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::SessionUser;
use crate::web::state::AppState;

/// POST /api/auth/register - Create an account and log it in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<UserInfo>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = register_user(&repo, &req.username, &req.password).await?;

    let session = state.sessions.lock().await.create(user.id, &user.username);
    let jar = jar.add(session_cookie(&state.cookie_name, &session));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(ApiResponse::new(UserInfo::from(user))),
    ))
}

/// POST /api/auth/login - User login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<UserInfo>>), ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let repo = UserRepository::new(state.db.pool());
    let user = authenticate(&repo, &req.username, &req.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let session = state.sessions.lock().await.create(user.id, &user.username);
    let jar = jar.add(session_cookie(&state.cookie_name, &session));

    Ok((jar, Json(ApiResponse::new(UserInfo::from(user)))))
}

/// POST /api/auth/logout - End the current session.
///
/// Succeeds without a session too; the cookie is cleared either way.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    if let Some(cookie) = jar.get(&state.cookie_name) {
        state.sessions.lock().await.remove(cookie.value());
    }

    let jar = jar.remove(Cookie::build(state.cookie_name.clone()).path("/"));
    (jar, StatusCode::NO_CONTENT)
}

/// GET /api/auth/me - Get current user info.
pub async fn me(SessionUser(session): SessionUser) -> Json<ApiResponse<UserInfo>> {
    Json(ApiResponse::new(UserInfo {
        id: session.user_id,
        username: session.username,
    }))
}

fn session_cookie(name: &str, session: &AuthSession) -> Cookie<'static> {
    Cookie::build((name.to_string(), session.token.clone()))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_session_cookie_attributes() {
        let session = AuthSession::new(1, "alice", Duration::from_secs(60));
        let cookie = session_cookie("sid", &session);

        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.value(), session.token);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }
}
