use thiserror::Error;
use uuid::Uuid;

use crate::services::capacity::CapacityError;
use crate::services::ledger::LedgerError;
use crate::store::StoreError;

/// Ошибки ядра бронирования, видимые вызывающему слою.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("seat {0} is already taken")]
    SeatTaken(String),
    #[error("showtime {0} is sold out")]
    SoldOut(Uuid),
    #[error("caller is not authenticated")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("cannot cancel booking less than {cutoff_hours} hours before showtime")]
    TooLateToCancel { cutoff_hours: i64 },
    #[error("cannot update status for past showtimes")]
    TooLateForPastShowtime,
    #[error("invalid ticket status: {0}")]
    InvalidStatus(String),
    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(Uuid),
    #[error("booking failed: {0}")]
    BookingFailed(String),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        BookingError::NotFound { entity, id }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

impl From<LedgerError> for BookingError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Conflict(coordinate) => BookingError::SeatTaken(coordinate.label().to_string()),
            LedgerError::Store(e) => BookingError::Storage(e),
        }
    }
}

impl From<CapacityError> for BookingError {
    fn from(e: CapacityError) -> Self {
        match e {
            CapacityError::NotFound(id) => BookingError::not_found("showtime", id),
            CapacityError::OutOfBounds { showtime_id, .. } => BookingError::SoldOut(showtime_id),
            CapacityError::Store(e) => BookingError::Storage(e),
        }
    }
}
