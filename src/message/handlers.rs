use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::MessageModel,
    service::MessageService,
    types::{ConversationSummary, SendMessageRequest, UnreadCountResponse},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

fn message_service(state: &AppState) -> MessageService {
    MessageService::new(
        Arc::clone(&state.message_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.booking_repository),
        Arc::clone(&state.email_sender),
        state.config.base_url.clone(),
    )
}

/// POST /api/messages
#[instrument(name = "send_message", skip(state, claims, request))]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageModel>), AppError> {
    let message = message_service(&state)
        .send(&claims.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/messages
#[instrument(name = "list_conversations", skip(state, claims))]
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    Ok(Json(
        message_service(&state)
            .conversations(&claims.user_id)
            .await?,
    ))
}

/// GET /api/messages/:user_id
#[instrument(name = "get_thread", skip(state, claims))]
pub async fn get_thread(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(other_id): Path<String>,
) -> Result<Json<Vec<MessageModel>>, AppError> {
    Ok(Json(
        message_service(&state)
            .thread(&claims.user_id, &other_id)
            .await?,
    ))
}

/// GET /api/messages/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let count = message_service(&state)
        .unread_count(&claims.user_id)
        .await?;
    Ok(Json(UnreadCountResponse { count }))
}
