pub mod availability;
pub mod bookings;
pub mod tickets;

use axum::{http::StatusCode, Router};
use std::sync::Arc;
use tracing::error;
use validator::Validate;

use crate::error::BookingError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(bookings::routes())
        .merge(availability::routes())
        .merge(tickets::routes())
}

/// Ошибка ядра -> HTTP-ответ. Детали внутренних сбоев клиенту не отдаём.
pub fn error_response(e: BookingError) -> (StatusCode, String) {
    let status = match &e {
        BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
        BookingError::SeatTaken(_) | BookingError::SoldOut(_) | BookingError::AlreadyCancelled(_) => {
            StatusCode::CONFLICT
        }
        BookingError::Unauthorized => StatusCode::UNAUTHORIZED,
        BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
        BookingError::TooLateToCancel { .. } | BookingError::TooLateForPastShowtime => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BookingError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
        BookingError::BookingFailed(_) | BookingError::Storage(_) => {
            error!("Request failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "booking could not be completed".to_string());
        }
    };
    (status, e.to_string())
}

pub(crate) fn validate<T: Validate>(request: &T) -> Result<(), (StatusCode, String)> {
    request
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}
