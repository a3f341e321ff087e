use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::BookingService;

/// Сколько сеансов сверяем одновременно.
const RECONCILE_CONCURRENCY: usize = 4;

pub struct CleanupService {
    booking: BookingService,
}

impl CleanupService {
    pub fn new(booking: BookingService) -> Self {
        Self { booking }
    }

    /// Полная очистка: истёкшие холды + сверка счётчиков мест
    pub async fn run_full_cleanup(&self) -> CleanupStats {
        info!("🧹 Starting full cleanup process");

        let released_holds = self.cleanup_expired_holds().await;
        let (showtimes_checked, repaired) = self.reconcile_capacity().await;

        let stats = CleanupStats {
            released_holds,
            showtimes_checked,
            repaired,
        };
        info!("✅ Full cleanup process completed: {:?}", stats);
        stats
    }

    /// Освобождение мест с истёкшим холдом
    async fn cleanup_expired_holds(&self) -> usize {
        match self.booking.sweep_expired_holds().await {
            Ok(0) => {
                info!("💺 No expired holds to cleanup");
                0
            }
            Ok(released) => {
                info!("💺 Released {} expired seat holds", released);
                released
            }
            Err(e) => {
                error!("💺 Failed to sweep expired holds: {}", e);
                0
            }
        }
    }

    /// Сверка available_seats с живыми билетами по всем сеансам
    async fn reconcile_capacity(&self) -> (usize, Vec<Uuid>) {
        let ids = match self.booking.showtime_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("🎬 Failed to list showtimes for reconciliation: {}", e);
                return (0, Vec::new());
            }
        };

        let checked = ids.len();
        let repaired: Vec<Uuid> = stream::iter(ids)
            .map(|id| self.reconcile_one(id))
            .buffer_unordered(RECONCILE_CONCURRENCY)
            .filter_map(|repaired| async move { repaired })
            .collect()
            .await;

        if !repaired.is_empty() {
            warn!("🎬 Repaired available seats on {} showtimes", repaired.len());
        }
        (checked, repaired)
    }

    /// `Some(id)`, если счётчик сеанса пришлось исправить.
    async fn reconcile_one(&self, showtime_id: Uuid) -> Option<Uuid> {
        match self.booking.get_availability(showtime_id).await {
            Ok(availability) => availability.repaired.then_some(showtime_id),
            Err(e) => {
                error!("🎬 Failed to reconcile showtime {}: {}", showtime_id, e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupStats {
    pub released_holds: usize,
    pub showtimes_checked: usize,
    /// Сеансы с исправленным счётчиком: их закешированная доступность устарела.
    pub repaired: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Caller, Showtime};
    use crate::services::BookingPolicy;
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    #[tokio::test]
    async fn cleanup_releases_holds_and_repairs_counters() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let drifted = Showtime {
            id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            theater_id: Uuid::new_v4(),
            start_time: now + Duration::hours(6),
            end_time: now + Duration::hours(8),
            price: 1000,
            available_seats: 2,
            capacity: 5,
        };
        store.insert_showtime(drifted.clone()).await;

        let clock = Arc::new(ManualClock::new(now));
        let service = BookingService::new(Arc::new(store), clock.clone(), BookingPolicy::default());
        service
            .hold_seat(&Caller::customer(Uuid::new_v4()), drifted.id, "A", "01")
            .await
            .unwrap();

        clock.advance(Duration::minutes(20));
        let stats = CleanupService::new(service.clone()).run_full_cleanup().await;

        assert_eq!(
            stats,
            CleanupStats { released_holds: 1, showtimes_checked: 1, repaired: vec![drifted.id] }
        );
        assert_eq!(service.get_availability(drifted.id).await.unwrap().available, 5);
    }
}
