use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument};

use super::{
    cookies::{removal_cookie, session_cookie, SESSION_COOKIE},
    types::{ChangePasswordRequest, LoginRequest, RegisterRequest, SessionClaims, SessionResponse},
};
use crate::shared::{AppError, AppState};
use crate::user::types::UserResponse;

/// POST /api/auth/register
#[instrument(name = "register", skip(state, jar, request))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), AppError> {
    let (user, token) = state.session_service.register(request).await?;
    info!(user_id = %user.id, "Registered and signed in");

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token, state.config.cookie_secure)),
        Json(SessionResponse {
            user: UserResponse::from(&user),
        }),
    ))
}

/// POST /api/auth/login
#[instrument(name = "login", skip(state, jar, request))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let (user, token) = state.session_service.login(request).await?;
    info!(user_id = %user.id, "Signed in with password");

    Ok((
        jar.add(session_cookie(token, state.config.cookie_secure)),
        Json(SessionResponse {
            user: UserResponse::from(&user),
        }),
    ))
}

/// POST /api/auth/logout
#[instrument(name = "logout", skip(state, jar, claims))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), AppError> {
    state
        .session_service
        .revoke_session(&claims.session_id)
        .await?;
    info!(user_id = %claims.user_id, "Signed out");

    Ok((StatusCode::NO_CONTENT, jar.remove(removal_cookie(SESSION_COOKIE))))
}

/// GET /api/auth/session
#[instrument(name = "current_session", skip(state, claims))]
pub async fn current_session(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = state
        .user_repository
        .get_user(&claims.user_id)
        .await?
        .ok_or_else(AppError::unauthenticated)?;

    Ok(Json(SessionResponse {
        user: UserResponse::from(&user),
    }))
}

/// PUT /api/auth/password
#[instrument(name = "change_password", skip(state, claims, request))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    state
        .session_service
        .change_password(&claims.user_id, request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
