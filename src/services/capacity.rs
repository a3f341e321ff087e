use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::store::{StoreError, StoreTx};

#[derive(Debug, Error)]
pub enum CapacityError {
    #[error("showtime {0} not found")]
    NotFound(Uuid),
    #[error("available seats of showtime {showtime_id} would leave [0, {capacity}]")]
    OutOfBounds { showtime_id: Uuid, capacity: i32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Проекция доступности сеанса: ёмкость зала, живые билеты, свободные места.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub showtime_id: Uuid,
    pub capacity: i32,
    pub booked: i64,
    pub available: i32,
    /// Счётчик расходился с билетами и был исправлен при чтении.
    pub repaired: bool,
}

pub async fn decrement(tx: &mut dyn StoreTx, showtime_id: Uuid) -> Result<i32, CapacityError> {
    adjust(tx, showtime_id, -1).await
}

pub async fn increment(tx: &mut dyn StoreTx, showtime_id: Uuid) -> Result<i32, CapacityError> {
    adjust(tx, showtime_id, 1).await
}

async fn adjust(tx: &mut dyn StoreTx, showtime_id: Uuid, delta: i32) -> Result<i32, CapacityError> {
    if let Some(value) = tx.add_available_seats(showtime_id, delta).await? {
        return Ok(value);
    }
    let showtime = tx
        .showtime(showtime_id)
        .await?
        .ok_or(CapacityError::NotFound(showtime_id))?;
    Err(CapacityError::OutOfBounds {
        showtime_id,
        capacity: showtime.capacity,
    })
}

/// Пересчитывает `available_seats = capacity - активные билеты` и пишет
/// значение, если оно разошлось со счётчиком.
pub async fn reconcile(tx: &mut dyn StoreTx, showtime_id: Uuid) -> Result<Availability, CapacityError> {
    let showtime = tx
        .lock_showtime(showtime_id)
        .await?
        .ok_or(CapacityError::NotFound(showtime_id))?;
    let booked = tx.count_active_tickets(showtime_id).await?;

    let capacity = i64::from(showtime.capacity);
    if booked > capacity {
        warn!(
            "Showtime {} has {} active tickets over capacity {}",
            showtime_id, booked, capacity
        );
    }
    let expected = (capacity - booked).clamp(0, capacity) as i32;

    let repaired = expected != showtime.available_seats;
    if repaired {
        warn!(
            "Showtime {} available seats drifted: stored {}, expected {} - repairing",
            showtime_id, showtime.available_seats, expected
        );
        tx.set_available_seats(showtime_id, expected).await?;
    }

    Ok(Availability {
        showtime_id,
        capacity: showtime.capacity,
        booked,
        available: expected,
        repaired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Showtime;
    use crate::store::{BookingStore, MemoryStore};
    use chrono::{Duration, Utc};

    async fn store_with(available: i32, capacity: i32) -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let showtime = Showtime {
            id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            theater_id: Uuid::new_v4(),
            start_time: now + Duration::hours(3),
            end_time: now + Duration::hours(5),
            price: 800,
            available_seats: available,
            capacity,
        };
        let id = showtime.id;
        store.insert_showtime(showtime).await;
        (store, id)
    }

    #[tokio::test]
    async fn decrement_stops_at_zero() {
        let (store, id) = store_with(1, 1).await;
        let mut tx = store.begin().await.unwrap();

        assert_eq!(decrement(tx.as_mut(), id).await.unwrap(), 0);
        assert!(matches!(
            decrement(tx.as_mut(), id).await,
            Err(CapacityError::OutOfBounds { capacity: 1, .. })
        ));
        assert_eq!(increment(tx.as_mut(), id).await.unwrap(), 1);
        assert!(matches!(increment(tx.as_mut(), id).await, Err(CapacityError::OutOfBounds { .. })));
    }

    #[tokio::test]
    async fn unknown_showtime_is_not_found() {
        let (store, _) = store_with(1, 1).await;
        let mut tx = store.begin().await.unwrap();
        let missing = Uuid::new_v4();
        assert!(matches!(decrement(tx.as_mut(), missing).await, Err(CapacityError::NotFound(id)) if id == missing));
        assert!(matches!(reconcile(tx.as_mut(), missing).await, Err(CapacityError::NotFound(_))));
    }

    #[tokio::test]
    async fn reconcile_repairs_drift() {
        let (store, id) = store_with(3, 10).await;
        let mut tx = store.begin().await.unwrap();

        let availability = reconcile(tx.as_mut(), id).await.unwrap();
        assert!(availability.repaired);
        assert_eq!(availability.available, 10);
        assert_eq!(availability.booked, 0);

        let again = reconcile(tx.as_mut(), id).await.unwrap();
        assert!(!again.repaired);
    }
}
