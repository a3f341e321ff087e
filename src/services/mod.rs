pub mod booking;
pub mod cancellation;
pub mod capacity;
pub mod cleanup;
pub mod ledger;

pub use booking::{BookingPolicy, BookingReceipt, BookingService};
pub use cancellation::{Actor, CutoffPolicy};
pub use capacity::Availability;
pub use cleanup::{CleanupService, CleanupStats};
