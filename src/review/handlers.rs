use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::ReviewModel,
    service::ReviewService,
    types::{CreateReviewRequest, UserReviewsResponse},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

fn review_service(state: &AppState) -> ReviewService {
    ReviewService::new(
        Arc::clone(&state.review_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.booking_repository),
    )
}

/// POST /api/reviews
#[instrument(name = "create_review", skip(state, claims, request))]
pub async fn create_review(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewModel>), AppError> {
    let review = review_service(&state)
        .create_review(&claims.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/users/:id/reviews
#[instrument(name = "list_user_reviews", skip(state))]
pub async fn list_user_reviews(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserReviewsResponse>, AppError> {
    Ok(Json(review_service(&state).reviews_for_user(&user_id).await?))
}
