use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::SeatCoordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Confirmed => "confirmed",
            TicketStatus::Cancelled => "cancelled",
        }
    }

    /// pending -> confirmed -> cancelled, cancelled терминален.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Pending, TicketStatus::Confirmed)
                | (TicketStatus::Pending, TicketStatus::Cancelled)
                | (TicketStatus::Confirmed, TicketStatus::Cancelled)
        )
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TicketStatus::Pending),
            "confirmed" => Ok(TicketStatus::Confirmed),
            "cancelled" => Ok(TicketStatus::Cancelled),
            other => Err(format!("unknown ticket status {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub showtime_id: Uuid,
    pub customer_id: Uuid,
    pub seat_id: Uuid,
    pub row: String,
    pub seat_number: String,
    pub price: i64,
    pub status: TicketStatus,
    pub purchase_date: DateTime<Utc>,
}

impl Ticket {
    pub fn coordinate(&self) -> SeatCoordinate {
        SeatCoordinate::new(self.showtime_id, self.row.clone(), self.seat_number.clone())
    }

    pub fn is_active(&self) -> bool {
        self.status != TicketStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_terminal() {
        for next in [TicketStatus::Pending, TicketStatus::Confirmed, TicketStatus::Cancelled] {
            assert!(!TicketStatus::Cancelled.can_transition_to(next));
        }
        assert!(TicketStatus::Confirmed.can_transition_to(TicketStatus::Cancelled));
        assert!(!TicketStatus::Confirmed.can_transition_to(TicketStatus::Pending));
    }

    #[test]
    fn rejects_unknown_status_text() {
        assert!("refunded".parse::<TicketStatus>().is_err());
        assert_eq!("confirmed".parse::<TicketStatus>(), Ok(TicketStatus::Confirmed));
    }
}
