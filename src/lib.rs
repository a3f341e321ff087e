pub mod cache;
pub mod clock;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;

use crate::clock::SystemClock;
use crate::services::{BookingPolicy, BookingService};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub booking: BookingService,
}

impl AppState {
    pub async fn new(
        config: config::Config,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        let cache = cache::CacheService::new(redis.clone(), config.booking.availability_cache_ttl_secs);

        let booking = BookingService::new(
            Arc::new(db.store()),
            Arc::new(SystemClock),
            BookingPolicy::from(&config.booking),
        );

        Ok(Arc::new(Self {
            db,
            redis,
            cache,
            config,
            booking,
        }))
    }
}
