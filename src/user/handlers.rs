use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::ProfileModel,
    service::UserService,
    types::{
        MeResponse, PublicUserResponse, UpdateProfileRequest, UpdateRolesRequest,
        UpdateUserRequest, UserResponse,
    },
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

fn user_service(state: &AppState) -> UserService {
    UserService::new(
        Arc::clone(&state.user_repository),
        Arc::clone(&state.review_repository),
    )
}

/// GET /api/users/me
#[instrument(name = "get_me", skip(state, claims))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<MeResponse>, AppError> {
    Ok(Json(user_service(&state).get_me(&claims.user_id).await?))
}

/// PATCH /api/users/me
#[instrument(name = "update_me", skip(state, claims, request))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(
        user_service(&state)
            .update_me(&claims.user_id, request)
            .await?,
    ))
}

/// PUT /api/users/me/roles
#[instrument(name = "update_roles", skip(state, claims))]
pub async fn update_roles(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<UpdateRolesRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(
        user_service(&state)
            .update_roles(&claims.user_id, request)
            .await?,
    ))
}

/// GET /api/users/me/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<ProfileModel>, AppError> {
    Ok(Json(user_service(&state).get_profile(&claims.user_id).await?))
}

/// PUT /api/users/me/profile
#[instrument(name = "update_profile", skip(state, claims, request))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileModel>, AppError> {
    Ok(Json(
        user_service(&state)
            .update_profile(&claims.user_id, request)
            .await?,
    ))
}

/// GET /api/users/:id
#[instrument(name = "get_public_user", skip(state))]
pub async fn get_public_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicUserResponse>, AppError> {
    Ok(Json(user_service(&state).get_public_user(&user_id).await?))
}
