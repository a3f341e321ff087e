//! ledger.rs
//!
//! Реестр мест: статус каждой координаты (сеанс, ряд, номер) и версия для
//! оптимистичной блокировки. Все изменения существующих строк идут через
//! условный апдейт по версии, новые строки - через вставку под уникальным
//! индексом. Чтение-затем-запись без условия здесь не используется.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Seat, SeatCoordinate, SeatStatus, SeatUpdate};
use crate::store::{StoreError, StoreTx};

/// Сколько раз перечитываем строку, если версия ушла вперёд во время release.
const MAX_CAS_RETRIES: usize = 3;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("seat {0} is not available")]
    Conflict(SeatCoordinate),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Условный апдейт места: применяется только при совпадении версии.
pub async fn update_with_version(
    tx: &mut dyn StoreTx,
    seat_id: Uuid,
    expected_version: i64,
    update: &SeatUpdate,
) -> Result<Option<Seat>, LedgerError> {
    Ok(tx.update_seat_with_version(seat_id, expected_version, update).await?)
}

/// Захватывает место под бронь покупателя `customer_id`.
///
/// Нет строки - создаём сразу в BOOKED с версией 0. Есть строка - место должно
/// быть свободно (или держаться холдом этого же покупателя), переход в BOOKED
/// делается условным апдейтом по прочитанной версии.
pub async fn try_reserve(
    tx: &mut dyn StoreTx,
    coordinate: &SeatCoordinate,
    customer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Seat, LedgerError> {
    let Some(seat) = tx.seat(coordinate).await? else {
        let seat = Seat::new(coordinate, SeatStatus::Booked, now);
        if tx.insert_seat(&seat).await? {
            debug!("Seat {} created as BOOKED", coordinate);
            return Ok(seat);
        }
        // кто-то вставил строку параллельно
        return Err(LedgerError::Conflict(coordinate.clone()));
    };

    if seat.status == SeatStatus::Booked {
        return Err(LedgerError::Conflict(coordinate.clone()));
    }
    if let Some(holder) = seat.active_hold(now) {
        if holder != customer_id {
            return Err(LedgerError::Conflict(coordinate.clone()));
        }
    }

    let update = SeatUpdate::status(SeatStatus::Booked, now);
    update_with_version(tx, seat.id, seat.version, &update)
        .await?
        .ok_or_else(|| LedgerError::Conflict(coordinate.clone()))
}

/// Возвращает место в AVAILABLE и снимает холд. Идемпотентно: для уже
/// свободного места без холда ничего не пишет. `None`, если места нет.
pub async fn release(
    tx: &mut dyn StoreTx,
    seat_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<Seat>, LedgerError> {
    for _ in 0..MAX_CAS_RETRIES {
        let Some(seat) = tx.seat_by_id(seat_id).await? else {
            warn!("Release of unknown seat {}", seat_id);
            return Ok(None);
        };

        if seat.status == SeatStatus::Available && seat.locked_by.is_none() {
            return Ok(Some(seat));
        }

        let update = SeatUpdate::status(SeatStatus::Available, now);
        if let Some(released) = update_with_version(tx, seat.id, seat.version, &update).await? {
            return Ok(Some(released));
        }
        debug!("Seat {} changed during release, re-reading", seat_id);
    }

    let seat = tx.seat_by_id(seat_id).await?;
    match seat {
        Some(seat) => Err(LedgerError::Conflict(seat.coordinate())),
        None => Ok(None),
    }
}

/// Временный холд места покупателем на `ttl`. Истёкший чужой холд
/// считается свободным местом, свой холд продлевается.
pub async fn hold(
    tx: &mut dyn StoreTx,
    coordinate: &SeatCoordinate,
    customer_id: Uuid,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Seat, LedgerError> {
    let update = SeatUpdate::hold(customer_id, now + ttl, now);

    let Some(seat) = tx.seat(coordinate).await? else {
        let mut seat = Seat::new(coordinate, SeatStatus::Reserved, now);
        seat.lock_expires_at = update.lock_expires_at;
        seat.locked_by = update.locked_by;
        if tx.insert_seat(&seat).await? {
            return Ok(seat);
        }
        return Err(LedgerError::Conflict(coordinate.clone()));
    };

    match seat.status {
        SeatStatus::Booked => return Err(LedgerError::Conflict(coordinate.clone())),
        SeatStatus::Reserved => {
            if let Some(holder) = seat.active_hold(now) {
                if holder != customer_id {
                    return Err(LedgerError::Conflict(coordinate.clone()));
                }
            }
        }
        SeatStatus::Available => {}
    }

    update_with_version(tx, seat.id, seat.version, &update)
        .await?
        .ok_or_else(|| LedgerError::Conflict(coordinate.clone()))
}

/// Снимает холд, если его держит `customer_id`. `false` - снимать нечего.
pub async fn release_hold(
    tx: &mut dyn StoreTx,
    coordinate: &SeatCoordinate,
    customer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, LedgerError> {
    let Some(seat) = tx.seat(coordinate).await? else {
        return Ok(false);
    };
    if seat.status != SeatStatus::Reserved || seat.locked_by != Some(customer_id) {
        return Ok(false);
    }

    let update = SeatUpdate::status(SeatStatus::Available, now);
    match update_with_version(tx, seat.id, seat.version, &update).await? {
        Some(_) => Ok(true),
        None => Err(LedgerError::Conflict(coordinate.clone())),
    }
}

/// Освобождает все места с истёкшим холдом.
pub async fn sweep_expired_holds(
    tx: &mut dyn StoreTx,
    now: DateTime<Utc>,
) -> Result<Vec<Seat>, LedgerError> {
    let expired = tx.expired_holds(now).await?;
    let mut released = Vec::with_capacity(expired.len());

    for seat in expired {
        let update = SeatUpdate::status(SeatStatus::Available, now);
        match update_with_version(tx, seat.id, seat.version, &update).await? {
            Some(seat) => released.push(seat),
            None => debug!("Hold on seat {} changed before sweep", seat.id),
        }
    }

    Ok(released)
}

/// Заранее создаёт свободные места сеанса: ряды `rows`, номера 01..=seats_per_row.
/// Существующие координаты не трогает. Возвращает число созданных мест.
pub async fn seed(
    tx: &mut dyn StoreTx,
    showtime_id: Uuid,
    rows: &[String],
    seats_per_row: u32,
    now: DateTime<Utc>,
) -> Result<u32, LedgerError> {
    let mut created = 0;
    for row in rows {
        for number in 1..=seats_per_row {
            let coordinate = SeatCoordinate::new(showtime_id, row.clone(), format!("{number:02}"));
            if tx.insert_seat(&Seat::new(&coordinate, SeatStatus::Available, now)).await? {
                created += 1;
            }
        }
    }
    info!("Seeded {} seats for showtime {}", created, showtime_id);
    Ok(created)
}
