use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{service::AdminService, types::AdminStats};
use crate::pre_registration::{
    handlers::pre_registration_service, models::PreRegistrationModel,
};
use crate::shared::{AppError, AppState};
use crate::user::types::UserResponse;
use crate::verification::{
    handlers::verification_service,
    models::VerificationRequestModel,
    types::{ReviewVerificationRequest, VerificationQuery},
};

fn admin_service(state: &AppState) -> AdminService {
    AdminService::new(
        Arc::clone(&state.user_repository),
        Arc::clone(&state.space_repository),
        Arc::clone(&state.store_repository),
        Arc::clone(&state.booking_repository),
        Arc::clone(&state.verification_repository),
    )
}

/// GET /api/admin/users
#[instrument(name = "admin_list_users", skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(Json(admin_service(&state).list_users().await?))
}

/// GET /api/admin/stats
#[instrument(name = "admin_stats", skip(state))]
pub async fn stats(State(state): State<AppState>) -> Result<Json<AdminStats>, AppError> {
    Ok(Json(admin_service(&state).stats().await?))
}

/// GET /api/admin/verifications?status=pending
#[instrument(name = "admin_list_verifications", skip(state))]
pub async fn list_verifications(
    State(state): State<AppState>,
    Query(query): Query<VerificationQuery>,
) -> Result<Json<Vec<VerificationRequestModel>>, AppError> {
    Ok(Json(verification_service(&state).list(query.status).await?))
}

/// PATCH /api/admin/verifications/:id
#[instrument(name = "admin_review_verification", skip(state, request))]
pub async fn review_verification(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(request): Json<ReviewVerificationRequest>,
) -> Result<Json<VerificationRequestModel>, AppError> {
    let reviewed = verification_service(&state)
        .review(&request_id, request)
        .await?;
    Ok(Json(reviewed))
}

/// GET /api/admin/pre-registrations
#[instrument(name = "admin_list_pre_registrations", skip(state))]
pub async fn list_pre_registrations(
    State(state): State<AppState>,
) -> Result<Json<Vec<PreRegistrationModel>>, AppError> {
    Ok(Json(pre_registration_service(&state).list().await?))
}
