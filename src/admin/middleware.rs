use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{instrument, warn};

use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

/// Admin gate. Must run inside `require_session` so SessionClaims are present.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), admin::require_admin))
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<SessionClaims>()
        .cloned()
        .ok_or_else(AppError::unauthenticated)?;

    let user = state
        .user_repository
        .get_user(&claims.user_id)
        .await?
        .ok_or_else(AppError::unauthenticated)?;

    if !user.is_admin {
        warn!(user_id = %claims.user_id, "Non-admin attempted to access admin route");
        return Err(AppError::Forbidden("管理者権限が必要です".to_string()));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::user::{models::UserModel, repository::InMemoryUserRepository};
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn claims_for(user: &UserModel) -> SessionClaims {
        SessionClaims {
            session_id: "session".to_string(),
            user_id: user.id.clone(),
            exp: usize::MAX,
            iat: 0,
        }
    }

    async fn status_for(user: &UserModel) -> StatusCode {
        let users = Arc::new(InMemoryUserRepository::with_users(vec![user.clone()]));
        let state = AppStateBuilder::new().with_user_repository(users).build();
        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state, require_admin))
            .layer(Extension(claims_for(user)));

        app.oneshot(HttpRequest::get("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_admin_passes() {
        let mut admin = UserModel::new("admin@example.jp", "管理者".to_string(), &[]);
        admin.is_admin = true;
        assert_eq!(status_for(&admin).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_regular_user_is_forbidden() {
        let user = UserModel::new("user@example.jp", "利用者".to_string(), &[]);
        assert_eq!(status_for(&user).await, StatusCode::FORBIDDEN);
    }
}
