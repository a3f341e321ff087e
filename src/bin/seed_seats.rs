//! Заранее создаёт места для всех сеансов: ряды A-E по 10 мест.
//! Ряды и число мест переопределяются через SEED_ROWS=A,B,C и SEED_SEATS_PER_ROW.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use showtime_booking::{
    clock::SystemClock,
    config::Config,
    database::Database,
    services::{BookingPolicy, BookingService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("showtime_booking=info,seed_seats=info"))
        .init();

    let config = Config::from_env()?;
    let rows: Vec<String> = env::var("SEED_ROWS")
        .unwrap_or_else(|_| "A,B,C,D,E".to_string())
        .split(',')
        .map(|row| row.trim().to_uppercase())
        .filter(|row| !row.is_empty())
        .collect();
    let seats_per_row: u32 = env::var("SEED_SEATS_PER_ROW")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .context("SEED_SEATS_PER_ROW must be a valid number")?;

    let db = Database::new(&config.database.url, config.database.pool_size).await?;
    db.run_migrations().await?;

    let service = BookingService::new(
        Arc::new(db.store()),
        Arc::new(SystemClock),
        BookingPolicy::from(&config.booking),
    );

    let mut total = 0;
    for showtime_id in service.showtime_ids().await? {
        match service.seed_seats(showtime_id, &rows, seats_per_row).await {
            Ok(created) => total += created,
            Err(e) => warn!("Seeding showtime {} failed: {}", showtime_id, e),
        }
    }

    info!("Seeded {} seats in total", total);
    Ok(())
}
