use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::patch,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::error_response;
use crate::models::{Caller, TicketStatus};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tickets/{id}/status", patch(update_ticket_status))
}

#[derive(Debug, Deserialize)]
pub struct TicketStatusRequest {
    pub status: TicketStatus,
}

// PATCH /api/tickets/{id}/status - только staff/admin
async fn update_ticket_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<TicketStatusRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let ticket = state
        .booking
        .set_ticket_status(&caller, ticket_id, req.status)
        .await
        .map_err(error_response)?;
    state.cache.invalidate_availability(ticket.showtime_id).await;

    Ok(Json(ticket))
}
