use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::BookingModel,
    service::BookingService,
    types::{BookingQuery, BookingResponse, CreateBookingRequest, UpdateBookingRequest},
};
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

fn booking_service(state: &AppState) -> BookingService {
    BookingService::new(
        Arc::clone(&state.booking_repository),
        Arc::clone(&state.space_repository),
        Arc::clone(&state.store_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.email_sender),
        state.config.base_url.clone(),
    )
}

/// POST /api/bookings
#[instrument(name = "create_booking", skip(state, claims, request))]
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingModel>), AppError> {
    let booking = booking_service(&state)
        .create_booking(&claims.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /api/bookings?as=vendor|owner
#[instrument(name = "list_bookings", skip(state, claims))]
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = booking_service(&state)
        .list_bookings(&claims.user_id, query.side)
        .await?;
    Ok(Json(bookings))
}

/// GET /api/bookings/:id
#[instrument(name = "get_booking", skip(state, claims))]
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = booking_service(&state)
        .get_booking(&booking_id, &claims.user_id)
        .await?;
    Ok(Json(booking))
}

/// PATCH /api/bookings/:id
#[instrument(name = "update_booking", skip(state, claims, request))]
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(booking_id): Path<String>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<Json<BookingModel>, AppError> {
    let booking = booking_service(&state)
        .update_status(&booking_id, &claims.user_id, request)
        .await?;
    Ok(Json(booking))
}
