use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::VerificationRequestModel, service::VerificationService,
    types::SubmitVerificationRequest,
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

pub fn verification_service(state: &AppState) -> VerificationService {
    VerificationService::new(
        Arc::clone(&state.verification_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.email_sender),
        state.config.base_url.clone(),
    )
}

/// POST /api/verification
#[instrument(name = "submit_verification", skip(state, claims, request))]
pub async fn submit_verification(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<SubmitVerificationRequest>,
) -> Result<(StatusCode, Json<VerificationRequestModel>), AppError> {
    let request = verification_service(&state)
        .submit(&claims.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/verification
///
/// Responds with `null` when the caller never applied.
#[instrument(name = "get_verification", skip(state, claims))]
pub async fn get_verification(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Option<VerificationRequestModel>>, AppError> {
    Ok(Json(
        verification_service(&state)
            .latest(&claims.user_id)
            .await?,
    ))
}
