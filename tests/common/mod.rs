#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use showtime_booking::clock::ManualClock;
use showtime_booking::models::{Seat, SeatCoordinate, Showtime, Theater};
use showtime_booking::services::{BookingPolicy, BookingService};
use showtime_booking::store::{BookingStore, MemoryStore};

pub struct Fixture {
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub service: BookingService,
    pub showtime: Showtime,
    pub now: DateTime<Utc>,
}

/// Зал на `capacity` мест и сеанс, начинающийся через `starts_in`.
pub async fn fixture(capacity: i32, starts_in: Duration) -> Fixture {
    let now = Utc::now();
    let store = MemoryStore::new();
    let theater = Theater {
        id: Uuid::new_v4(),
        name: "Hall 1".to_string(),
        capacity,
    };
    store.insert_theater(theater.clone()).await;
    let showtime = store
        .schedule_showtime(theater.id, Uuid::new_v4(), now + starts_in, now + starts_in + Duration::hours(2), 1200)
        .await
        .expect("theater exists");

    let clock = Arc::new(ManualClock::new(now));
    let service = BookingService::new(Arc::new(store.clone()), clock.clone(), BookingPolicy::default());

    Fixture {
        store,
        clock,
        service,
        showtime,
        now,
    }
}

impl Fixture {
    pub async fn seat(&self, row: &str, number: &str) -> Option<Seat> {
        let mut tx = self.store.begin().await.unwrap();
        tx.seat(&SeatCoordinate::new(self.showtime.id, row, number)).await.unwrap()
    }

    pub async fn available_seats(&self) -> i32 {
        let mut tx = self.store.begin().await.unwrap();
        tx.showtime(self.showtime.id).await.unwrap().unwrap().available_seats
    }

    pub async fn active_tickets(&self) -> i64 {
        let mut tx = self.store.begin().await.unwrap();
        tx.count_active_tickets(self.showtime.id).await.unwrap()
    }
}

/// Метка места по порядковому номеру: A01..A10, B01...
pub fn seat_at(index: usize) -> (String, String) {
    let row = (b'A' + (index / 10) as u8) as char;
    (row.to_string(), format!("{:02}", index % 10 + 1))
}
