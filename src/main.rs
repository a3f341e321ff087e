use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showtime_booking::{config::Config, controllers, services::CleanupService, AppState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log));
    if config.app.environment == "production" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting showtime booking API ({})", config.app.environment);

    let app_state = AppState::new(config.clone())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    info!("Database and Redis connected");

    if let Err(e) = app_state.redis.ping().await {
        error!("Redis ping failed, availability cache will miss: {}", e);
    }

    // --- Start background tasks ---

    // Истёкшие холды и сверка счётчиков мест
    let cleanup = CleanupService::new(app_state.booking.clone());
    let cache = app_state.cache.clone();
    let interval_secs = config.booking.cleanup_interval_secs.max(1);
    task::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let stats = cleanup.run_full_cleanup().await;
            for showtime_id in stats.repaired {
                cache.invalidate_availability(showtime_id).await;
            }
        }
    });

    // --- Start the web server ---

    let app = Router::new()
        .route("/", get(|| async { "Showtime Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(app_state.clone())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
