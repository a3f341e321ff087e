use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{error_response, validate};
use crate::models::Caller;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/cancel", patch(cancel_booking))
        .route("/seats/hold", patch(hold_seat))
        .route("/seats/release", patch(release_seat))
}

/* ---------- DTO ---------- */

#[derive(Debug, Deserialize, Validate)]
pub struct SeatRequest {
    pub showtime_id: Uuid,
    #[validate(length(min = 1, max = 2, message = "row must be 1-2 characters"))]
    pub row: String,
    #[validate(length(min = 1, max = 3, message = "seat_number must be 1-3 characters"))]
    pub seat_number: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelBookingRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Serialize)]
struct ReleaseResponse {
    released: bool,
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<SeatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&req)?;

    let receipt = state
        .booking
        .book(&caller, req.showtime_id, &req.row, &req.seat_number)
        .await
        .map_err(error_response)?;
    state.cache.invalidate_availability(req.showtime_id).await;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// GET /api/bookings
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bookings = state
        .booking
        .bookings_for_customer(&caller)
        .await
        .map_err(error_response)?;
    Ok(Json(bookings))
}

// PATCH /api/bookings/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<CancelBookingRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&req)?;

    let booking = state
        .booking
        .cancel(&caller, req.booking_id)
        .await
        .map_err(error_response)?;
    state.cache.invalidate_availability(booking.showtime_id).await;

    Ok(Json(booking))
}

/* ---------- SEATS ---------- */

// PATCH /api/seats/hold
async fn hold_seat(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<SeatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&req)?;

    let seat = state
        .booking
        .hold_seat(&caller, req.showtime_id, &req.row, &req.seat_number)
        .await
        .map_err(error_response)?;
    Ok(Json(seat))
}

// PATCH /api/seats/release
async fn release_seat(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<SeatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&req)?;

    let released = state
        .booking
        .release_hold(&caller, req.showtime_id, &req.row, &req.seat_number)
        .await
        .map_err(error_response)?;
    Ok(Json(ReleaseResponse { released }))
}
