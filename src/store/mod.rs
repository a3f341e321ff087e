//! store
//!
//! Граница хранения для ядра бронирования. Все чтения и записи одного
//! сценария (бронь, отмена, холд, сверка счётчика) выполняются внутри одного
//! `StoreTx`: `commit` фиксирует изменения, `rollback` или drop их отбрасывает.
//!
//! Реализации:
//! 1.  **PgStore**: Postgres через sqlx. Уникальность координаты места держит
//!     уникальный индекс, захват места - условные `INSERT .. ON CONFLICT` и
//!     `UPDATE .. WHERE version = $n`.
//! 2.  **MemoryStore**: in-process хранилище для тестов и локального запуска,
//!     транзакции сериализуются мьютексом.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Booking, Seat, SeatCoordinate, SeatUpdate, Showtime, Ticket};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Точки, в которых `MemoryStore` умеет имитировать сбой записи.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertSeat,
    UpdateSeat,
    InsertBooking,
    SaveBookingState,
    AdjustCapacity,
    Commit,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("injected failure at {0:?}")]
    Injected(FailPoint),
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

#[async_trait]
pub trait StoreTx: Send {
    async fn showtime(&mut self, id: Uuid) -> Result<Option<Showtime>, StoreError>;

    /// Как `showtime`, но блокирует строку сеанса до конца транзакции.
    async fn lock_showtime(&mut self, id: Uuid) -> Result<Option<Showtime>, StoreError>;

    async fn showtime_ids(&mut self) -> Result<Vec<Uuid>, StoreError>;

    async fn seat(&mut self, coordinate: &SeatCoordinate) -> Result<Option<Seat>, StoreError>;

    async fn seat_by_id(&mut self, id: Uuid) -> Result<Option<Seat>, StoreError>;

    async fn seats_for_showtime(&mut self, showtime_id: Uuid) -> Result<Vec<Seat>, StoreError>;

    /// Вставляет новое место. `false`, если координата уже занята строкой.
    async fn insert_seat(&mut self, seat: &Seat) -> Result<bool, StoreError>;

    /// Условный апдейт: применяется только если версия в хранилище равна
    /// `expected_version`, версия увеличивается на 1. Иначе `None`.
    async fn update_seat_with_version(
        &mut self,
        id: Uuid,
        expected_version: i64,
        update: &SeatUpdate,
    ) -> Result<Option<Seat>, StoreError>;

    async fn expired_holds(&mut self, now: DateTime<Utc>) -> Result<Vec<Seat>, StoreError>;

    async fn active_ticket_at(
        &mut self,
        coordinate: &SeatCoordinate,
    ) -> Result<Option<Ticket>, StoreError>;

    async fn count_active_tickets(&mut self, showtime_id: Uuid) -> Result<i64, StoreError>;

    /// Пишет билет, платёж и бронь вместе.
    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), StoreError>;

    async fn booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn booking_by_ticket(&mut self, ticket_id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Читает бронь и блокирует её строки (бронь, билет, платёж) до конца
    /// транзакции. Параллельные отмены одной брони выстраиваются в очередь.
    async fn lock_booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Как `lock_booking`, но по id билета.
    async fn lock_booking_by_ticket(&mut self, ticket_id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn bookings_for_customer(&mut self, customer_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    /// Сохраняет статусы брони, её билета и платежа.
    async fn save_booking_state(&mut self, booking: &Booking) -> Result<(), StoreError>;

    /// Атомарно прибавляет `delta` к `available_seats`. `None`, если результат
    /// вышел бы за `[0, capacity]` или сеанса нет.
    async fn add_available_seats(
        &mut self,
        showtime_id: Uuid,
        delta: i32,
    ) -> Result<Option<i32>, StoreError>;

    async fn set_available_seats(&mut self, showtime_id: Uuid, value: i32) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
