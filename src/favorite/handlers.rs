use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{models::FavoriteModel, service::FavoriteService, types::AddFavoriteRequest};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};
use crate::space::models::SpaceModel;

fn favorite_service(state: &AppState) -> FavoriteService {
    FavoriteService::new(
        Arc::clone(&state.favorite_repository),
        Arc::clone(&state.space_repository),
    )
}

/// GET /api/favorites
#[instrument(name = "list_favorites", skip(state, claims))]
pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<SpaceModel>>, AppError> {
    Ok(Json(favorite_service(&state).list(&claims.user_id).await?))
}

/// POST /api/favorites
#[instrument(name = "add_favorite", skip(state, claims, request))]
pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteModel>), AppError> {
    let favorite = favorite_service(&state)
        .add(&claims.user_id, &request.space_id)
        .await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

/// DELETE /api/favorites/:space_id
#[instrument(name = "remove_favorite", skip(state, claims))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(space_id): Path<String>,
) -> Result<StatusCode, AppError> {
    favorite_service(&state)
        .remove(&claims.user_id, &space_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
