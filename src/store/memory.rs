use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::{BookingStore, FailPoint, StoreError, StoreTx};
use crate::models::{
    Booking, Seat, SeatCoordinate, SeatStatus, SeatUpdate, Showtime, Theater, Ticket,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    theaters: HashMap<Uuid, Theater>,
    showtimes: HashMap<Uuid, Showtime>,
    seats: HashMap<Uuid, Seat>,
    seat_index: HashMap<SeatCoordinate, Uuid>,
    bookings: HashMap<Uuid, Booking>,
    ticket_index: HashMap<Uuid, Uuid>,
}

/// In-memory хранилище. Одна транзакция за раз, на rollback/drop
/// состояние восстанавливается из снимка, сделанного в `begin`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fault: Arc<std::sync::Mutex<Option<FailPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_theater(&self, theater: Theater) {
        self.state.lock().await.theaters.insert(theater.id, theater);
    }

    /// Создаёт сеанс в зале: ёмкость берётся из зала, все места свободны.
    pub async fn schedule_showtime(
        &self,
        theater_id: Uuid,
        movie_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        price: i64,
    ) -> Option<Showtime> {
        let mut state = self.state.lock().await;
        let capacity = state.theaters.get(&theater_id)?.capacity;
        let showtime = Showtime {
            id: Uuid::new_v4(),
            movie_id,
            theater_id,
            start_time,
            end_time,
            price,
            available_seats: capacity,
            capacity,
        };
        state.showtimes.insert(showtime.id, showtime.clone());
        Some(showtime)
    }

    /// Сохраняет сеанс как есть, включая произвольный `available_seats`.
    pub async fn insert_showtime(&self, showtime: Showtime) {
        self.state.lock().await.showtimes.insert(showtime.id, showtime);
    }

    /// Следующая операция в точке `point` завершится ошибкой.
    pub fn fail_next(&self, point: FailPoint) {
        *self.fault.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(point);
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = Some(guard.clone());
        Ok(Box::new(MemoryTx {
            guard,
            snapshot,
            fault: self.fault.clone(),
        }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
    fault: Arc<std::sync::Mutex<Option<FailPoint>>>,
}

impl MemoryTx {
    fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut fault = self.fault.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *fault == Some(point) {
            *fault = None;
            return Err(StoreError::Injected(point));
        }
        Ok(())
    }

    fn tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.guard.bookings.values().map(|b| &b.ticket)
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            debug!("memory transaction rolled back");
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn showtime(&mut self, id: Uuid) -> Result<Option<Showtime>, StoreError> {
        Ok(self.guard.showtimes.get(&id).cloned())
    }

    async fn lock_showtime(&mut self, id: Uuid) -> Result<Option<Showtime>, StoreError> {
        // транзакция и так эксклюзивна
        Ok(self.guard.showtimes.get(&id).cloned())
    }

    async fn showtime_ids(&mut self) -> Result<Vec<Uuid>, StoreError> {
        Ok(self.guard.showtimes.keys().copied().collect())
    }

    async fn seat(&mut self, coordinate: &SeatCoordinate) -> Result<Option<Seat>, StoreError> {
        Ok(self
            .guard
            .seat_index
            .get(coordinate)
            .and_then(|id| self.guard.seats.get(id))
            .cloned())
    }

    async fn seat_by_id(&mut self, id: Uuid) -> Result<Option<Seat>, StoreError> {
        Ok(self.guard.seats.get(&id).cloned())
    }

    async fn seats_for_showtime(&mut self, showtime_id: Uuid) -> Result<Vec<Seat>, StoreError> {
        let mut seats: Vec<Seat> = self
            .guard
            .seats
            .values()
            .filter(|s| s.showtime_id == showtime_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| (&a.row, &a.seat_number).cmp(&(&b.row, &b.seat_number)));
        Ok(seats)
    }

    async fn insert_seat(&mut self, seat: &Seat) -> Result<bool, StoreError> {
        self.trip(FailPoint::InsertSeat)?;
        let coordinate = seat.coordinate();
        if self.guard.seat_index.contains_key(&coordinate) {
            return Ok(false);
        }
        self.guard.seat_index.insert(coordinate, seat.id);
        self.guard.seats.insert(seat.id, seat.clone());
        Ok(true)
    }

    async fn update_seat_with_version(
        &mut self,
        id: Uuid,
        expected_version: i64,
        update: &SeatUpdate,
    ) -> Result<Option<Seat>, StoreError> {
        self.trip(FailPoint::UpdateSeat)?;
        match self.guard.seats.get_mut(&id) {
            Some(seat) if seat.version == expected_version => {
                update.apply(seat);
                Ok(Some(seat.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn expired_holds(&mut self, now: DateTime<Utc>) -> Result<Vec<Seat>, StoreError> {
        Ok(self
            .guard
            .seats
            .values()
            .filter(|s| {
                s.status == SeatStatus::Reserved
                    && s.lock_expires_at.is_some_and(|expires| expires <= now)
            })
            .cloned()
            .collect())
    }

    async fn active_ticket_at(
        &mut self,
        coordinate: &SeatCoordinate,
    ) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .tickets()
            .find(|t| t.is_active() && t.coordinate() == *coordinate)
            .cloned())
    }

    async fn count_active_tickets(&mut self, showtime_id: Uuid) -> Result<i64, StoreError> {
        Ok(self
            .tickets()
            .filter(|t| t.showtime_id == showtime_id && t.is_active())
            .count() as i64)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), StoreError> {
        self.trip(FailPoint::InsertBooking)?;
        if self.guard.ticket_index.contains_key(&booking.ticket.id) {
            return Err(StoreError::Corrupt(format!(
                "ticket {} already exists",
                booking.ticket.id
            )));
        }
        self.guard.ticket_index.insert(booking.ticket.id, booking.id);
        self.guard.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.guard.bookings.get(&id).cloned())
    }

    async fn booking_by_ticket(&mut self, ticket_id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .guard
            .ticket_index
            .get(&ticket_id)
            .and_then(|id| self.guard.bookings.get(id))
            .cloned())
    }

    async fn lock_booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        // транзакция и так эксклюзивна
        self.booking(id).await
    }

    async fn lock_booking_by_ticket(&mut self, ticket_id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.booking_by_ticket(ticket_id).await
    }

    async fn bookings_for_customer(&mut self, customer_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .guard
            .bookings
            .values()
            .filter(|b| b.customer_id == customer_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn save_booking_state(&mut self, booking: &Booking) -> Result<(), StoreError> {
        self.trip(FailPoint::SaveBookingState)?;
        match self.guard.bookings.get_mut(&booking.id) {
            Some(stored) => {
                *stored = booking.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("booking {} does not exist", booking.id))),
        }
    }

    async fn add_available_seats(
        &mut self,
        showtime_id: Uuid,
        delta: i32,
    ) -> Result<Option<i32>, StoreError> {
        self.trip(FailPoint::AdjustCapacity)?;
        let Some(showtime) = self.guard.showtimes.get_mut(&showtime_id) else {
            return Ok(None);
        };
        let next = showtime.available_seats + delta;
        if next < 0 || next > showtime.capacity {
            return Ok(None);
        }
        showtime.available_seats = next;
        Ok(Some(next))
    }

    async fn set_available_seats(&mut self, showtime_id: Uuid, value: i32) -> Result<(), StoreError> {
        self.trip(FailPoint::AdjustCapacity)?;
        if let Some(showtime) = self.guard.showtimes.get_mut(&showtime_id) {
            showtime.available_seats = value;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.trip(FailPoint::Commit)?;
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // снимок восстановится в Drop
        drop(self);
        Ok(())
    }
}
