use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theater {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
}

/// Сеанс. `capacity` берётся из зала, `available_seats` - счётчик свободных мест.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Showtime {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price: i64,
    pub available_seats: i32,
    pub capacity: i32,
}

impl Showtime {
    /// Часы до начала сеанса, дробные, отрицательные для прошедших.
    pub fn hours_until_start(&self, now: DateTime<Utc>) -> f64 {
        (self.start_time - now).num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hours_until_start_is_fractional() {
        let now = Utc::now();
        let showtime = Showtime {
            id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            theater_id: Uuid::new_v4(),
            start_time: now + Duration::minutes(90),
            end_time: now + Duration::minutes(210),
            price: 1200,
            available_seats: 10,
            capacity: 10,
        };
        assert!((showtime.hours_until_start(now) - 1.5).abs() < f64::EPSILON);
        assert!(!showtime.has_started(now));
        assert!(showtime.has_started(now + Duration::hours(2)));
    }
}
