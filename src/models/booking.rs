use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::{
    Payment, PaymentMethod, PaymentStatus, Seat, SeatLabel, Showtime, Ticket, TicketStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status {other}")),
        }
    }
}

impl From<TicketStatus> for BookingStatus {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::Pending => BookingStatus::Pending,
            TicketStatus::Confirmed => BookingStatus::Confirmed,
            TicketStatus::Cancelled => BookingStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingPaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl BookingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Pending => "pending",
            BookingPaymentStatus::Paid => "paid",
            BookingPaymentStatus::Failed => "failed",
            BookingPaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for BookingPaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingPaymentStatus::Pending),
            "paid" => Ok(BookingPaymentStatus::Paid),
            "failed" => Ok(BookingPaymentStatus::Failed),
            "refunded" => Ok(BookingPaymentStatus::Refunded),
            other => Err(format!("unknown booking payment status {other}")),
        }
    }
}

/// Бронь - корень агрегата. Билет и платёж принадлежат ей, статусы всех трёх
/// записей меняются только через методы брони.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub showtime_id: Uuid,
    pub seats: Vec<SeatLabel>,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub payment_status: BookingPaymentStatus,
    pub ticket: Ticket,
    pub payment: Payment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Подтверждённая и оплаченная бронь на одно место по цене сеанса.
    pub fn confirmed(customer_id: Uuid, showtime: &Showtime, seat: &Seat, now: DateTime<Utc>) -> Self {
        let ticket = Ticket {
            id: Uuid::new_v4(),
            showtime_id: showtime.id,
            customer_id,
            seat_id: seat.id,
            row: seat.row.clone(),
            seat_number: seat.seat_number.clone(),
            price: showtime.price,
            status: TicketStatus::Confirmed,
            purchase_date: now,
        };
        let payment = Payment {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            amount: showtime.price,
            method: PaymentMethod::Online,
            status: PaymentStatus::Completed,
            payment_date: now,
        };

        Self {
            id: Uuid::new_v4(),
            customer_id,
            showtime_id: showtime.id,
            seats: vec![seat.coordinate().label()],
            total_amount: showtime.price,
            status: BookingStatus::Confirmed,
            payment_status: BookingPaymentStatus::Paid,
            ticket,
            payment,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Мягкая отмена: билет cancelled, платёж REFUNDED, бронь cancelled/refunded.
    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        self.ticket.status = TicketStatus::Cancelled;
        self.payment.status = PaymentStatus::Refunded;
        self.status = BookingStatus::Cancelled;
        self.payment_status = BookingPaymentStatus::Refunded;
        self.updated_at = now;
    }

    /// Смена статуса билета без отмены (pending -> confirmed).
    pub fn set_ticket_status(&mut self, status: TicketStatus, now: DateTime<Utc>) {
        self.ticket.status = status;
        self.status = status.into();
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeatCoordinate, SeatStatus};
    use chrono::Duration;

    fn showtime(now: DateTime<Utc>) -> Showtime {
        Showtime {
            id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            theater_id: Uuid::new_v4(),
            start_time: now + Duration::hours(3),
            end_time: now + Duration::hours(5),
            price: 1500,
            available_seats: 80,
            capacity: 80,
        }
    }

    #[test]
    fn confirmed_booking_links_ticket_and_payment() {
        let now = Utc::now();
        let show = showtime(now);
        let seat = Seat::new(&SeatCoordinate::new(show.id, "A", "01"), SeatStatus::Booked, now);
        let booking = Booking::confirmed(Uuid::new_v4(), &show, &seat, now);

        assert_eq!(booking.seats, vec![SeatLabel("A01".into())]);
        assert_eq!(booking.total_amount, 1500);
        assert_eq!(booking.ticket.price, 1500);
        assert_eq!(booking.ticket.seat_id, seat.id);
        assert_eq!(booking.payment.ticket_id, booking.ticket.id);
        assert_eq!(booking.payment.method, PaymentMethod::Online);
        assert_eq!(booking.payment.status, PaymentStatus::Completed);
        assert_eq!(booking.payment_status, BookingPaymentStatus::Paid);
    }

    #[test]
    fn cancellation_flips_every_owned_record() {
        let now = Utc::now();
        let show = showtime(now);
        let seat = Seat::new(&SeatCoordinate::new(show.id, "C", "04"), SeatStatus::Booked, now);
        let mut booking = Booking::confirmed(Uuid::new_v4(), &show, &seat, now);

        booking.mark_cancelled(now);
        assert!(booking.is_cancelled());
        assert_eq!(booking.ticket.status, TicketStatus::Cancelled);
        assert_eq!(booking.payment.status, PaymentStatus::Refunded);
        assert_eq!(booking.payment_status, BookingPaymentStatus::Refunded);
    }
}
