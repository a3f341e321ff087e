use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{BookingStore, StoreError, StoreTx};
use crate::models::{
    Booking, Payment, Seat, SeatCoordinate, SeatLabel, SeatUpdate, Showtime, Ticket,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

/* ---------- rows ---------- */

fn corrupt(e: String) -> StoreError {
    StoreError::Corrupt(e)
}

#[derive(FromRow)]
struct ShowtimeRow {
    id: Uuid,
    movie_id: Uuid,
    theater_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    price: i64,
    available_seats: i32,
    capacity: i32,
}

impl From<ShowtimeRow> for Showtime {
    fn from(r: ShowtimeRow) -> Self {
        Showtime {
            id: r.id,
            movie_id: r.movie_id,
            theater_id: r.theater_id,
            start_time: r.start_time,
            end_time: r.end_time,
            price: r.price,
            available_seats: r.available_seats,
            capacity: r.capacity,
        }
    }
}

#[derive(FromRow)]
struct SeatRow {
    id: Uuid,
    showtime_id: Uuid,
    seat_row: String,
    seat_number: String,
    status: String,
    version: i64,
    lock_expires_at: Option<DateTime<Utc>>,
    locked_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SeatRow> for Seat {
    type Error = StoreError;

    fn try_from(r: SeatRow) -> Result<Self, Self::Error> {
        Ok(Seat {
            id: r.id,
            showtime_id: r.showtime_id,
            row: r.seat_row,
            seat_number: r.seat_number,
            status: r.status.parse().map_err(corrupt)?,
            version: r.version,
            lock_expires_at: r.lock_expires_at,
            locked_by: r.locked_by,
            updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    showtime_id: Uuid,
    customer_id: Uuid,
    seat_id: Uuid,
    seat_row: String,
    seat_number: String,
    price: i64,
    status: String,
    purchase_date: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(r: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: r.id,
            showtime_id: r.showtime_id,
            customer_id: r.customer_id,
            seat_id: r.seat_id,
            row: r.seat_row,
            seat_number: r.seat_number,
            price: r.price,
            status: r.status.parse().map_err(corrupt)?,
            purchase_date: r.purchase_date,
        })
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: Uuid,
    showtime_id: Uuid,
    seats: Vec<String>,
    total_amount: i64,
    status: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ticket_id: Uuid,
    seat_id: Uuid,
    seat_row: String,
    seat_number: String,
    price: i64,
    ticket_status: String,
    purchase_date: DateTime<Utc>,
    payment_id: Uuid,
    amount: i64,
    payment_method: String,
    payment_record_status: String,
    payment_date: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(r: BookingRow) -> Result<Self, Self::Error> {
        let ticket = Ticket {
            id: r.ticket_id,
            showtime_id: r.showtime_id,
            customer_id: r.customer_id,
            seat_id: r.seat_id,
            row: r.seat_row,
            seat_number: r.seat_number,
            price: r.price,
            status: r.ticket_status.parse().map_err(corrupt)?,
            purchase_date: r.purchase_date,
        };
        let payment = Payment {
            id: r.payment_id,
            ticket_id: r.ticket_id,
            amount: r.amount,
            method: r.payment_method.parse().map_err(corrupt)?,
            status: r.payment_record_status.parse().map_err(corrupt)?,
            payment_date: r.payment_date,
        };
        Ok(Booking {
            id: r.id,
            customer_id: r.customer_id,
            showtime_id: r.showtime_id,
            seats: r.seats.into_iter().map(SeatLabel).collect(),
            total_amount: r.total_amount,
            status: r.status.parse().map_err(corrupt)?,
            payment_status: r.payment_status.parse().map_err(corrupt)?,
            ticket,
            payment,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const SHOWTIME_SELECT: &str = r#"
    SELECT s.id, s.movie_id, s.theater_id, s.start_time, s.end_time, s.price,
           s.available_seats, t.capacity
    FROM showtimes s
    JOIN theaters t ON t.id = s.theater_id
    WHERE s.id = $1
"#;

const SEAT_COLUMNS: &str =
    "id, showtime_id, seat_row, seat_number, status, version, lock_expires_at, locked_by, updated_at";

const BOOKING_SELECT: &str = r#"
    SELECT b.id, b.customer_id, b.showtime_id, b.seats, b.total_amount, b.status,
           b.payment_status, b.created_at, b.updated_at,
           t.id AS ticket_id, t.seat_id, t.seat_row, t.seat_number, t.price,
           t.status AS ticket_status, t.purchase_date,
           p.id AS payment_id, p.amount, p.payment_method,
           p.payment_status AS payment_record_status, p.payment_date
    FROM bookings b
    JOIN tickets t ON t.id = b.ticket_id
    JOIN payments p ON p.id = b.payment_id
"#;

#[async_trait]
impl StoreTx for PgTx {
    async fn showtime(&mut self, id: Uuid) -> Result<Option<Showtime>, StoreError> {
        let row = sqlx::query_as::<_, ShowtimeRow>(SHOWTIME_SELECT)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Showtime::from))
    }

    async fn lock_showtime(&mut self, id: Uuid) -> Result<Option<Showtime>, StoreError> {
        let query = format!("{SHOWTIME_SELECT} FOR UPDATE OF s");
        let row = sqlx::query_as::<_, ShowtimeRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Showtime::from))
    }

    async fn showtime_ids(&mut self) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM showtimes ORDER BY start_time")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(ids)
    }

    async fn seat(&mut self, coordinate: &SeatCoordinate) -> Result<Option<Seat>, StoreError> {
        let query = format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE showtime_id = $1 AND seat_row = $2 AND seat_number = $3"
        );
        sqlx::query_as::<_, SeatRow>(&query)
            .bind(coordinate.showtime_id)
            .bind(&coordinate.row)
            .bind(&coordinate.seat_number)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Seat::try_from)
            .transpose()
    }

    async fn seat_by_id(&mut self, id: Uuid) -> Result<Option<Seat>, StoreError> {
        let query = format!("SELECT {SEAT_COLUMNS} FROM seats WHERE id = $1");
        sqlx::query_as::<_, SeatRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Seat::try_from)
            .transpose()
    }

    async fn seats_for_showtime(&mut self, showtime_id: Uuid) -> Result<Vec<Seat>, StoreError> {
        let query = format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE showtime_id = $1 ORDER BY seat_row, seat_number"
        );
        sqlx::query_as::<_, SeatRow>(&query)
            .bind(showtime_id)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Seat::try_from)
            .collect()
    }

    async fn insert_seat(&mut self, seat: &Seat) -> Result<bool, StoreError> {
        // уникальный индекс (showtime_id, seat_row, seat_number) решает гонку
        let res = sqlx::query(
            r#"
            INSERT INTO seats (id, showtime_id, seat_row, seat_number, status, version,
                               lock_expires_at, locked_by, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (showtime_id, seat_row, seat_number) DO NOTHING
            "#,
        )
        .bind(seat.id)
        .bind(seat.showtime_id)
        .bind(&seat.row)
        .bind(&seat.seat_number)
        .bind(seat.status.as_str())
        .bind(seat.version)
        .bind(seat.lock_expires_at)
        .bind(seat.locked_by)
        .bind(seat.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn update_seat_with_version(
        &mut self,
        id: Uuid,
        expected_version: i64,
        update: &SeatUpdate,
    ) -> Result<Option<Seat>, StoreError> {
        let query = format!(
            r#"
            UPDATE seats
            SET status = $3, lock_expires_at = $4, locked_by = $5, updated_at = $6,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {SEAT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, SeatRow>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(update.status.as_str())
            .bind(update.lock_expires_at)
            .bind(update.locked_by)
            .bind(update.updated_at)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Seat::try_from)
            .transpose()
    }

    async fn expired_holds(&mut self, now: DateTime<Utc>) -> Result<Vec<Seat>, StoreError> {
        let query = format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE status = 'RESERVED' AND lock_expires_at <= $1"
        );
        sqlx::query_as::<_, SeatRow>(&query)
            .bind(now)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Seat::try_from)
            .collect()
    }

    async fn active_ticket_at(
        &mut self,
        coordinate: &SeatCoordinate,
    ) -> Result<Option<Ticket>, StoreError> {
        sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, showtime_id, customer_id, seat_id, seat_row, seat_number, price, status,
                   purchase_date
            FROM tickets
            WHERE showtime_id = $1 AND seat_row = $2 AND seat_number = $3
              AND status <> 'cancelled'
            "#,
        )
        .bind(coordinate.showtime_id)
        .bind(&coordinate.row)
        .bind(&coordinate.seat_number)
        .fetch_optional(&mut *self.tx)
        .await?
        .map(Ticket::try_from)
        .transpose()
    }

    async fn count_active_tickets(&mut self, showtime_id: Uuid) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tickets WHERE showtime_id = $1 AND status <> 'cancelled'",
        )
        .bind(showtime_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), StoreError> {
        let ticket = &booking.ticket;
        sqlx::query(
            r#"
            INSERT INTO tickets (id, showtime_id, customer_id, seat_id, seat_row, seat_number,
                                 price, status, purchase_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.showtime_id)
        .bind(ticket.customer_id)
        .bind(ticket.seat_id)
        .bind(&ticket.row)
        .bind(&ticket.seat_number)
        .bind(ticket.price)
        .bind(ticket.status.as_str())
        .bind(ticket.purchase_date)
        .execute(&mut *self.tx)
        .await?;

        let payment = &booking.payment;
        sqlx::query(
            r#"
            INSERT INTO payments (id, ticket_id, amount, payment_method, payment_status, payment_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.id)
        .bind(payment.ticket_id)
        .bind(payment.amount)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.payment_date)
        .execute(&mut *self.tx)
        .await?;

        let seats: Vec<String> = booking.seats.iter().map(|s| s.0.clone()).collect();
        sqlx::query(
            r#"
            INSERT INTO bookings (id, customer_id, showtime_id, seats, total_amount, status,
                                  payment_status, ticket_id, payment_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(booking.id)
        .bind(booking.customer_id)
        .bind(booking.showtime_id)
        .bind(seats)
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(ticket.id)
        .bind(payment.id)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let query = format!("{BOOKING_SELECT} WHERE b.id = $1");
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn booking_by_ticket(&mut self, ticket_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let query = format!("{BOOKING_SELECT} WHERE b.ticket_id = $1");
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(ticket_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn lock_booking(&mut self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        // после ожидания блокировки строки перечитываются в последней версии
        let query = format!("{BOOKING_SELECT} WHERE b.id = $1 FOR UPDATE OF b, t, p");
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn lock_booking_by_ticket(&mut self, ticket_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let query = format!("{BOOKING_SELECT} WHERE b.ticket_id = $1 FOR UPDATE OF b, t, p");
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(ticket_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn bookings_for_customer(&mut self, customer_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let query = format!("{BOOKING_SELECT} WHERE b.customer_id = $1 ORDER BY b.created_at DESC");
        sqlx::query_as::<_, BookingRow>(&query)
            .bind(customer_id)
            .fetch_all(&mut *self.tx)
            .await?
            .into_iter()
            .map(Booking::try_from)
            .collect()
    }

    async fn save_booking_state(&mut self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query("UPDATE tickets SET status = $2 WHERE id = $1")
            .bind(booking.ticket.id)
            .bind(booking.ticket.status.as_str())
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("UPDATE payments SET payment_status = $2 WHERE id = $1")
            .bind(booking.payment.id)
            .bind(booking.payment.status.as_str())
            .execute(&mut *self.tx)
            .await?;

        let res = sqlx::query(
            "UPDATE bookings SET status = $2, payment_status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if res.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!("booking {} does not exist", booking.id)));
        }
        Ok(())
    }

    async fn add_available_seats(
        &mut self,
        showtime_id: Uuid,
        delta: i32,
    ) -> Result<Option<i32>, StoreError> {
        // одна атомарная операция с границами [0, capacity]
        let value = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE showtimes s
            SET available_seats = s.available_seats + $2
            FROM theaters t
            WHERE s.id = $1 AND t.id = s.theater_id
              AND s.available_seats + $2 BETWEEN 0 AND t.capacity
            RETURNING s.available_seats
            "#,
        )
        .bind(showtime_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(value)
    }

    async fn set_available_seats(&mut self, showtime_id: Uuid, value: i32) -> Result<(), StoreError> {
        sqlx::query("UPDATE showtimes SET available_seats = $2 WHERE id = $1")
            .bind(showtime_id)
            .bind(value)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
