use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatStatus {
    Available,
    Booked,
    Reserved,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Booked => "BOOKED",
            SeatStatus::Reserved => "RESERVED",
        }
    }
}

impl FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(SeatStatus::Available),
            "BOOKED" => Ok(SeatStatus::Booked),
            "RESERVED" => Ok(SeatStatus::Reserved),
            other => Err(format!("unknown seat status {other}")),
        }
    }
}

/// Координата места: (сеанс, ряд, номер). Уникальна в пределах хранилища.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatCoordinate {
    pub showtime_id: Uuid,
    pub row: String,
    pub seat_number: String,
}

impl SeatCoordinate {
    pub fn new(showtime_id: Uuid, row: impl Into<String>, seat_number: impl Into<String>) -> Self {
        Self {
            showtime_id,
            row: row.into(),
            seat_number: seat_number.into(),
        }
    }

    pub fn label(&self) -> SeatLabel {
        SeatLabel(format!("{}{}", self.row, self.seat_number))
    }
}

impl fmt::Display for SeatCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.showtime_id, self.row, self.seat_number)
    }
}

/// Подпись места в брони, формат `"{row}{seatNumber}"`, например `A01`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatLabel(pub String);

impl SeatLabel {
    /// Первый символ - ряд, остальное - номер места.
    pub fn parts(&self) -> Option<(&str, &str)> {
        let first = self.0.chars().next()?;
        let split = first.len_utf8();
        if self.0.len() <= split {
            return None;
        }
        Some(self.0.split_at(split))
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub showtime_id: Uuid,
    pub row: String,
    pub seat_number: String,
    pub status: SeatStatus,
    pub version: i64,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub locked_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Seat {
    pub fn new(coordinate: &SeatCoordinate, status: SeatStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            showtime_id: coordinate.showtime_id,
            row: coordinate.row.clone(),
            seat_number: coordinate.seat_number.clone(),
            status,
            version: 0,
            lock_expires_at: None,
            locked_by: None,
            updated_at: now,
        }
    }

    pub fn coordinate(&self) -> SeatCoordinate {
        SeatCoordinate::new(self.showtime_id, self.row.clone(), self.seat_number.clone())
    }

    /// Действующий (не истёкший) холд на момент `now`.
    pub fn active_hold(&self, now: DateTime<Utc>) -> Option<Uuid> {
        if self.status != SeatStatus::Reserved {
            return None;
        }
        match (self.locked_by, self.lock_expires_at) {
            (Some(owner), Some(expires)) if expires > now => Some(owner),
            _ => None,
        }
    }
}

/// Изменение, применяемое условным апдейтом `update_seat_with_version`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatUpdate {
    pub status: SeatStatus,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub locked_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl SeatUpdate {
    pub fn status(status: SeatStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            lock_expires_at: None,
            locked_by: None,
            updated_at: now,
        }
    }

    pub fn hold(customer_id: Uuid, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            status: SeatStatus::Reserved,
            lock_expires_at: Some(expires_at),
            locked_by: Some(customer_id),
            updated_at: now,
        }
    }

    pub fn apply(&self, seat: &mut Seat) {
        seat.status = self.status;
        seat.lock_expires_at = self.lock_expires_at;
        seat.locked_by = self.locked_by;
        seat.updated_at = self.updated_at;
        seat.version += 1;
    }
}
