use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::StoreModel,
    service::StoreService,
    types::{CreateStoreRequest, StoreQuery, UpdateStoreRequest},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

fn store_service(state: &AppState) -> StoreService {
    StoreService::new(
        Arc::clone(&state.store_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.booking_repository),
    )
}

/// GET /api/stores
#[instrument(name = "list_stores", skip(state))]
pub async fn list_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<Vec<StoreModel>>, AppError> {
    Ok(Json(store_service(&state).list(query.category).await?))
}

/// GET /api/stores/mine
#[instrument(name = "list_my_stores", skip(state, claims))]
pub async fn list_my_stores(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<StoreModel>>, AppError> {
    Ok(Json(store_service(&state).list_mine(&claims.user_id).await?))
}

/// POST /api/stores
#[instrument(name = "create_store", skip(state, claims, request))]
pub async fn create_store(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<StoreModel>), AppError> {
    let store = store_service(&state)
        .create_store(&claims.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// GET /api/stores/:id
#[instrument(name = "get_store", skip(state))]
pub async fn get_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Json<StoreModel>, AppError> {
    Ok(Json(store_service(&state).require_store(&store_id).await?))
}

/// PATCH /api/stores/:id
#[instrument(name = "update_store", skip(state, claims, request))]
pub async fn update_store(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(store_id): Path<String>,
    Json(request): Json<UpdateStoreRequest>,
) -> Result<Json<StoreModel>, AppError> {
    let store = store_service(&state)
        .update_store(&store_id, &claims.user_id, request)
        .await?;
    Ok(Json(store))
}

/// DELETE /api/stores/:id
#[instrument(name = "delete_store", skip(state, claims))]
pub async fn delete_store(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(store_id): Path<String>,
) -> Result<StatusCode, AppError> {
    store_service(&state)
        .delete_store(&store_id, &claims.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
