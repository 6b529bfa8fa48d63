use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::SpaceModel,
    service::{SpaceDependents, SpaceService},
    types::{CreateSpaceRequest, SpaceQuery, UpdateSpaceRequest},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

fn space_service(state: &AppState) -> SpaceService {
    SpaceService::new(
        Arc::clone(&state.space_repository),
        Arc::clone(&state.user_repository),
        SpaceDependents {
            bookings: Arc::clone(&state.booking_repository),
            favorites: Arc::clone(&state.favorite_repository),
            messages: Arc::clone(&state.message_repository),
            reviews: Arc::clone(&state.review_repository),
        },
    )
}

/// GET /api/spaces
#[instrument(name = "list_spaces", skip(state))]
pub async fn list_spaces(
    State(state): State<AppState>,
    Query(query): Query<SpaceQuery>,
) -> Result<Json<Vec<SpaceModel>>, AppError> {
    Ok(Json(space_service(&state).search(query).await?))
}

/// GET /api/spaces/mine
#[instrument(name = "list_my_spaces", skip(state, claims))]
pub async fn list_my_spaces(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<SpaceModel>>, AppError> {
    Ok(Json(space_service(&state).list_mine(&claims.user_id).await?))
}

/// POST /api/spaces
#[instrument(name = "create_space", skip(state, claims, request))]
pub async fn create_space(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<CreateSpaceRequest>,
) -> Result<(StatusCode, Json<SpaceModel>), AppError> {
    let space = space_service(&state)
        .create_space(&claims.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(space)))
}

/// GET /api/spaces/:id
#[instrument(name = "get_space", skip(state))]
pub async fn get_space(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
) -> Result<Json<SpaceModel>, AppError> {
    Ok(Json(space_service(&state).require_space(&space_id).await?))
}

/// PATCH /api/spaces/:id
#[instrument(name = "update_space", skip(state, claims, request))]
pub async fn update_space(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(space_id): Path<String>,
    Json(request): Json<UpdateSpaceRequest>,
) -> Result<Json<SpaceModel>, AppError> {
    let space = space_service(&state)
        .update_space(&space_id, &claims.user_id, request)
        .await?;
    Ok(Json(space))
}

/// DELETE /api/spaces/:id
#[instrument(name = "delete_space", skip(state, claims))]
pub async fn delete_space(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(space_id): Path<String>,
) -> Result<StatusCode, AppError> {
    space_service(&state)
        .delete_space(&space_id, &claims.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::space::repository::{InMemorySpaceRepository, SpaceRepository};
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_get_missing_space_is_404() {
        let app = Router::new()
            .route("/api/spaces/:id", get(get_space))
            .with_state(AppStateBuilder::new().build());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/spaces/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_spaces_applies_query() {
        let repo = Arc::new(InMemorySpaceRepository::new());
        let mut cheap = SpaceModel::new("o1", "駅前広場".to_string(), "東京都".to_string());
        cheap.price_per_day = 1000;
        let mut pricey = SpaceModel::new("o1", "駅前ビル".to_string(), "東京都".to_string());
        pricey.price_per_day = 9000;
        repo.create_space(&cheap).await.unwrap();
        repo.create_space(&pricey).await.unwrap();

        let app = Router::new()
            .route("/api/spaces", get(list_spaces))
            .with_state(AppStateBuilder::new().with_space_repository(repo).build());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/spaces?max_price=5000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let spaces: Vec<SpaceModel> = serde_json::from_slice(&body).unwrap();
        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].id, cheap.id);
    }
}
