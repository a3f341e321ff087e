pub mod seat;
pub mod showtime;
pub mod ticket;
pub mod payment;
pub mod booking;
pub mod caller;

pub use seat::{Seat, SeatCoordinate, SeatLabel, SeatStatus, SeatUpdate};
pub use showtime::{Showtime, Theater};
pub use ticket::{Ticket, TicketStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use booking::{Booking, BookingPaymentStatus, BookingStatus};
pub use caller::{Caller, Role};
