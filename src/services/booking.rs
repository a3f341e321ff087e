//! booking.rs
//!
//! Оркестратор бронирования. Один вызов `book` - одна транзакция хранилища:
//! проверка сеанса, захват места в реестре, создание билета, платежа и брони,
//! уменьшение счётчика свободных мест. Любой сбой после захвата места
//! откатывает транзакцию целиком, так что место не остаётся занятым без брони.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::BookingConfig;
use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, Caller, Seat, SeatCoordinate, Showtime};
use crate::services::capacity::{self, Availability, CapacityError};
use crate::services::ledger::{self, LedgerError};
use crate::store::{BookingStore, StoreError, StoreTx};

/// Правила ядра: окно отмены и длительность холда места.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    pub cancellation_cutoff_hours: i64,
    pub seat_hold_ttl: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            cancellation_cutoff_hours: 2,
            seat_hold_ttl: Duration::minutes(15),
        }
    }
}

impl From<&BookingConfig> for BookingPolicy {
    fn from(config: &BookingConfig) -> Self {
        Self {
            cancellation_cutoff_hours: config.cancellation_cutoff_hours,
            seat_hold_ttl: Duration::try_seconds(config.seat_hold_ttl_secs)
                .unwrap_or_else(|| Duration::minutes(15)),
        }
    }
}

/// Результат успешной брони: агрегат (с билетом и платежом) и занятое место.
#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub booking: Booking,
    pub seat: Seat,
    pub available_seats: i32,
}

#[derive(Clone)]
pub struct BookingService {
    pub(crate) store: Arc<dyn BookingStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policy: BookingPolicy,
}

pub(crate) fn require_customer(caller: &Caller) -> BookingResult<Uuid> {
    caller.customer_id.ok_or(BookingError::Unauthorized)
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>, policy: BookingPolicy) -> Self {
        Self { store, clock, policy }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Бронирует место `{row}{seat_number}` на сеанс для вызывающего покупателя.
    pub async fn book(
        &self,
        caller: &Caller,
        showtime_id: Uuid,
        row: &str,
        seat_number: &str,
    ) -> BookingResult<BookingReceipt> {
        let customer_id = require_customer(caller)?;
        let coordinate = SeatCoordinate::new(showtime_id, row, seat_number);
        let now = self.now();

        let mut tx = self.store.begin().await?;

        let showtime = tx
            .showtime(showtime_id)
            .await?
            .ok_or_else(|| BookingError::not_found("showtime", showtime_id))?;

        if tx.active_ticket_at(&coordinate).await?.is_some() {
            info!("Seat {} already has an active ticket", coordinate);
            return Err(BookingError::SeatTaken(coordinate.label().to_string()));
        }

        let seat = match ledger::try_reserve(tx.as_mut(), &coordinate, customer_id, now).await {
            Ok(seat) => seat,
            Err(LedgerError::Conflict(_)) => {
                info!("Seat {} claim lost to another booking", coordinate);
                return Err(BookingError::SeatTaken(coordinate.label().to_string()));
            }
            Err(LedgerError::Store(e)) => return Err(e.into()),
        };

        // место захвачено: дальше любой сбой компенсируется откатом.
        // Счётчик проверяется после места: спор за одно место - SeatTaken.
        if showtime.available_seats <= 0 {
            info!("Showtime {} is sold out", showtime_id);
            if let Err(rollback_err) = tx.rollback().await {
                error!("Rollback after sold out errored: {:?}", rollback_err);
            }
            return Err(BookingError::SoldOut(showtime_id));
        }

        let (booking, available_seats) =
            match write_booking(tx.as_mut(), customer_id, &showtime, &seat, now).await {
                Ok(written) => written,
                Err(e) => {
                    warn!("Booking of seat {} compensated: {}", coordinate, e);
                    if let Err(rollback_err) = tx.rollback().await {
                        error!("Rollback after failed booking errored: {:?}", rollback_err);
                    }
                    return Err(e);
                }
            };

        if let Err(e) = tx.commit().await {
            error!("Failed to commit booking of seat {}: {:?}", coordinate, e);
            return Err(BookingError::BookingFailed(e.to_string()));
        }

        info!(
            "Booking {} confirmed: customer {} seat {} ({} seats left)",
            booking.id, customer_id, coordinate, available_seats
        );

        Ok(BookingReceipt {
            booking,
            seat,
            available_seats,
        })
    }

    /// Доступность сеанса с проверкой согласованности счётчика.
    pub async fn get_availability(&self, showtime_id: Uuid) -> BookingResult<Availability> {
        let mut tx = self.store.begin().await?;
        let availability = capacity::reconcile(tx.as_mut(), showtime_id).await?;
        tx.commit().await?;
        Ok(availability)
    }

    /// История броней покупателя, новые первыми.
    pub async fn bookings_for_customer(&self, caller: &Caller) -> BookingResult<Vec<Booking>> {
        let customer_id = require_customer(caller)?;
        let mut tx = self.store.begin().await?;
        let bookings = tx.bookings_for_customer(customer_id).await?;
        tx.rollback().await?;
        Ok(bookings)
    }

    /// Держит место за покупателем на время из политики.
    pub async fn hold_seat(
        &self,
        caller: &Caller,
        showtime_id: Uuid,
        row: &str,
        seat_number: &str,
    ) -> BookingResult<Seat> {
        let customer_id = require_customer(caller)?;
        let coordinate = SeatCoordinate::new(showtime_id, row, seat_number);
        let now = self.now();

        let mut tx = self.store.begin().await?;
        tx.showtime(showtime_id)
            .await?
            .ok_or_else(|| BookingError::not_found("showtime", showtime_id))?;

        if tx.active_ticket_at(&coordinate).await?.is_some() {
            return Err(BookingError::SeatTaken(coordinate.label().to_string()));
        }

        let seat =
            ledger::hold(tx.as_mut(), &coordinate, customer_id, self.policy.seat_hold_ttl, now).await?;
        tx.commit().await?;

        debug!("Seat {} held by {} until {:?}", coordinate, customer_id, seat.lock_expires_at);
        Ok(seat)
    }

    /// Снимает холд вызывающего. `false`, если холда не было.
    pub async fn release_hold(
        &self,
        caller: &Caller,
        showtime_id: Uuid,
        row: &str,
        seat_number: &str,
    ) -> BookingResult<bool> {
        let customer_id = require_customer(caller)?;
        let coordinate = SeatCoordinate::new(showtime_id, row, seat_number);
        let now = self.now();

        let mut tx = self.store.begin().await?;
        let released = ledger::release_hold(tx.as_mut(), &coordinate, customer_id, now).await?;
        tx.commit().await?;
        Ok(released)
    }

    /// Освобождает все истёкшие холды. Возвращает число освобождённых мест.
    pub async fn sweep_expired_holds(&self) -> BookingResult<usize> {
        let now = self.now();
        let mut tx = self.store.begin().await?;
        let released = ledger::sweep_expired_holds(tx.as_mut(), now).await?;
        tx.commit().await?;
        Ok(released.len())
    }

    pub async fn showtime_ids(&self) -> BookingResult<Vec<Uuid>> {
        let mut tx = self.store.begin().await?;
        let ids = tx.showtime_ids().await?;
        tx.rollback().await?;
        Ok(ids)
    }

    /// Заранее создаёт места сеанса (ряды x номера).
    pub async fn seed_seats(
        &self,
        showtime_id: Uuid,
        rows: &[String],
        seats_per_row: u32,
    ) -> BookingResult<u32> {
        let now = self.now();
        let mut tx = self.store.begin().await?;
        tx.showtime(showtime_id)
            .await?
            .ok_or_else(|| BookingError::not_found("showtime", showtime_id))?;
        let created = ledger::seed(tx.as_mut(), showtime_id, rows, seats_per_row, now).await?;
        tx.commit().await?;
        Ok(created)
    }
}

fn write_failed(e: StoreError) -> BookingError {
    BookingError::BookingFailed(e.to_string())
}

/// Записи после захвата места: билет + платёж + бронь, затем счётчик.
async fn write_booking(
    tx: &mut dyn StoreTx,
    customer_id: Uuid,
    showtime: &Showtime,
    seat: &Seat,
    now: DateTime<Utc>,
) -> BookingResult<(Booking, i32)> {
    let booking = Booking::confirmed(customer_id, showtime, seat, now);
    tx.insert_booking(&booking).await.map_err(write_failed)?;

    let available = match capacity::decrement(tx, showtime.id).await {
        Ok(available) => available,
        Err(CapacityError::Store(e)) => return Err(write_failed(e)),
        Err(e) => return Err(e.into()),
    };

    Ok((booking, available))
}
