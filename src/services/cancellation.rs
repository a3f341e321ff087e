//! cancellation.rs
//!
//! Единая операция отмены брони. Самообслуживание покупателя и смена статуса
//! билета сотрудником проходят через `cancel_in_tx` с явными параметрами:
//! кто отменяет и действует ли окно отмены. Отмена всегда мягкая - билет
//! остаётся в хранилище со статусом cancelled.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::booking::{require_customer, BookingService};
use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, Caller, Ticket, TicketStatus};
use crate::services::capacity::{self, CapacityError};
use crate::services::ledger;
use crate::store::StoreTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// Покупатель, может отменить только свою бронь.
    Customer(Uuid),
    /// Сотрудник или администратор, владение не проверяется.
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffPolicy {
    Enforced,
    Waived,
}

impl BookingService {
    /// Отмена брони покупателем: проверка владельца и окна отмены.
    pub async fn cancel(&self, caller: &Caller, booking_id: Uuid) -> BookingResult<Booking> {
        let customer_id = require_customer(caller)?;
        self.cancel_booking(booking_id, Actor::Customer(customer_id), CutoffPolicy::Enforced)
            .await
    }

    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor: Actor,
        cutoff: CutoffPolicy,
    ) -> BookingResult<Booking> {
        let now = self.now();
        let mut tx = self.store.begin().await?;

        let booking = tx
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))?;

        let cancelled = self.cancel_in_tx(tx.as_mut(), booking, actor, cutoff, now).await?;
        tx.commit().await?;

        info!("Booking {} cancelled by {:?}", booking_id, actor);
        Ok(cancelled)
    }

    /// Смена статуса билета сотрудником. Переход в cancelled - полная отмена
    /// брони без окна отмены; прошедшие сеансы не меняются никогда.
    pub async fn set_ticket_status(
        &self,
        caller: &Caller,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> BookingResult<Ticket> {
        if !caller.role.is_privileged() {
            return Err(BookingError::Forbidden(
                "ticket status changes require staff or admin".to_string(),
            ));
        }

        let now = self.now();
        let mut tx = self.store.begin().await?;

        let mut booking = tx
            .lock_booking_by_ticket(ticket_id)
            .await?
            .ok_or_else(|| BookingError::not_found("ticket", ticket_id))?;
        let showtime = tx
            .showtime(booking.showtime_id)
            .await?
            .ok_or_else(|| BookingError::not_found("showtime", booking.showtime_id))?;

        if showtime.has_started(now) {
            return Err(BookingError::TooLateForPastShowtime);
        }

        let current = booking.ticket.status;
        if current == status {
            return Ok(booking.ticket);
        }
        if !current.can_transition_to(status) {
            return Err(BookingError::InvalidStatus(format!(
                "{} -> {}",
                current.as_str(),
                status.as_str()
            )));
        }

        let ticket = if status == TicketStatus::Cancelled {
            self.cancel_in_tx(tx.as_mut(), booking, Actor::Staff, CutoffPolicy::Waived, now)
                .await?
                .ticket
        } else {
            booking.set_ticket_status(status, now);
            tx.save_booking_state(&booking).await?;
            booking.ticket
        };
        tx.commit().await?;

        info!("Ticket {} status {} -> {}", ticket_id, current.as_str(), status.as_str());
        Ok(ticket)
    }

    async fn cancel_in_tx(
        &self,
        tx: &mut dyn StoreTx,
        mut booking: Booking,
        actor: Actor,
        cutoff: CutoffPolicy,
        now: DateTime<Utc>,
    ) -> BookingResult<Booking> {
        if let Actor::Customer(customer_id) = actor {
            if booking.customer_id != customer_id {
                warn!("Customer {} tried to cancel booking {} of another customer", customer_id, booking.id);
                return Err(BookingError::Forbidden(format!(
                    "booking {} does not belong to the caller",
                    booking.id
                )));
            }
        }
        if booking.is_cancelled() {
            return Err(BookingError::AlreadyCancelled(booking.id));
        }

        let showtime = tx
            .showtime(booking.showtime_id)
            .await?
            .ok_or_else(|| BookingError::not_found("showtime", booking.showtime_id))?;

        if cutoff == CutoffPolicy::Enforced {
            let hours = showtime.hours_until_start(now);
            if hours <= self.policy.cancellation_cutoff_hours as f64 {
                info!("Booking {} cancel rejected: {:.2}h before showtime", booking.id, hours);
                return Err(BookingError::TooLateToCancel {
                    cutoff_hours: self.policy.cancellation_cutoff_hours,
                });
            }
        }

        booking.mark_cancelled(now);
        tx.save_booking_state(&booking).await?;

        ledger::release(tx, booking.ticket.seat_id, now).await?;

        match capacity::increment(tx, showtime.id).await {
            Ok(_) => {}
            Err(CapacityError::OutOfBounds { .. }) => {
                // счётчик уже разошёлся с билетами: пересчитываем
                warn!("Available seats of showtime {} at capacity on cancel", showtime.id);
                capacity::reconcile(tx, showtime.id).await?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(booking)
    }
}
