use redis::AsyncCommands;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::services::Availability;

pub fn availability_key(showtime_id: Uuid) -> String {
    format!("availability:{showtime_id}")
}

impl CacheService {
    // Доступность сеанса из кеша, None при промахе или ошибке
    pub async fn get_availability(&self, showtime_id: Uuid) -> Option<Availability> {
        match self.read_availability(showtime_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Availability cache read failed for {}: {}", showtime_id, e);
                None
            }
        }
    }

    pub async fn save_availability(&self, availability: &Availability) {
        if let Err(e) = self.write_availability(availability).await {
            warn!("Availability cache write failed for {}: {}", availability.showtime_id, e);
        }
    }

    // Вызывается после каждой успешной брони, отмены и смены статуса
    pub async fn invalidate_availability(&self, showtime_id: Uuid) {
        let mut conn = self.redis.conn.clone();
        match conn.del::<_, i64>(availability_key(showtime_id)).await {
            Ok(_) => debug!("Availability cache invalidated for {}", showtime_id),
            Err(e) => warn!("Availability cache invalidation failed for {}: {}", showtime_id, e),
        }
    }

    // === Работа с Redis ===
    async fn read_availability(&self, showtime_id: Uuid) -> Result<Option<Availability>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(availability_key(showtime_id)).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let availability = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(Some(availability))
    }

    async fn write_availability(&self, availability: &Availability) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(availability).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(availability_key(availability.showtime_id), data, self.availability_ttl_secs)
            .await
    }
}
