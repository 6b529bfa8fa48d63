use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::instrument;

use super::{models::PreRegistrationModel, service::PreRegistrationService, types::PreRegisterRequest};
use crate::shared::{AppError, AppState};

pub fn pre_registration_service(state: &AppState) -> PreRegistrationService {
    PreRegistrationService::new(
        Arc::clone(&state.pre_registration_repository),
        Arc::clone(&state.email_sender),
    )
}

/// POST /api/pre-registrations
#[instrument(name = "pre_register", skip(state, request))]
pub async fn pre_register(
    State(state): State<AppState>,
    Json(request): Json<PreRegisterRequest>,
) -> Result<(StatusCode, Json<PreRegistrationModel>), AppError> {
    let registration = pre_registration_service(&state).register(request).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}
