use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::error_response;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/showtimes/{id}/availability", get(get_availability))
}

// GET /api/showtimes/{id}/availability
async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(showtime_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if let Some(cached) = state.cache.get_availability(showtime_id).await {
        debug!("Availability cache hit for {}", showtime_id);
        return Ok(Json(cached));
    }

    let availability = state
        .booking
        .get_availability(showtime_id)
        .await
        .map_err(error_response)?;
    state.cache.save_availability(&availability).await;

    Ok(Json(availability))
}
