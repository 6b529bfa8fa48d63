use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::{cookies::session_token, types::SessionClaims};
use crate::shared::{AppError, AppState};

/// Session authentication middleware - validates the session cookie (or Bearer header)
/// and adds SessionClaims to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), session::require_session))
/// Handlers can then extract Extension(claims): Extension<SessionClaims>.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(req.headers()).ok_or_else(|| {
        warn!("Request without session cookie or bearer token");
        AppError::unauthenticated()
    })?;

    let claims = state.session_service.validate_session(&token).await?;

    debug!(
        user_id = %claims.user_id,
        session_id = %claims.session_id,
        "Authentication successful, adding claims to request"
    );

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Claims for the current request when a valid session is present, for routes
/// that behave differently for signed-in callers but do not require it.
pub async fn optional_claims(state: &AppState, headers: &HeaderMap) -> Option<SessionClaims> {
    let token = session_token(headers)?;
    state.session_service.validate_session(&token).await.ok()
}
