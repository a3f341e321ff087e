use crate::redis_client::RedisClient;

pub mod availability;

/// Кеш ответов поверх Redis. Ошибки Redis не пробрасываются наружу:
/// при недоступном кеше сервис просто идёт в хранилище.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    availability_ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, availability_ttl_secs: u64) -> Self {
        Self {
            redis,
            availability_ttl_secs,
        }
    }
}
