mod common;

use chrono::Duration;
use proptest::prelude::*;
use uuid::Uuid;

use common::{fixture, seat_at};
use showtime_booking::models::Caller;

#[derive(Debug, Clone)]
enum Op {
    Book(usize),
    Cancel(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..12).prop_map(Op::Book),
        (0usize..12).prop_map(Op::Cancel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // available_seats + активные билеты == capacity после любой последовательности
    #[test]
    fn available_plus_active_equals_capacity(capacity in 1i32..8, ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let fx = fixture(capacity, Duration::hours(5)).await;
            let customer = Caller::customer(Uuid::new_v4());
            let mut bookings = Vec::new();

            for op in ops {
                match op {
                    Op::Book(index) => {
                        let (row, number) = seat_at(index);
                        if let Ok(receipt) = fx.service.book(&customer, fx.showtime.id, &row, &number).await {
                            bookings.push(receipt.booking.id);
                        }
                    }
                    Op::Cancel(index) => {
                        if !bookings.is_empty() {
                            let id = bookings[index % bookings.len()];
                            let _ = fx.service.cancel(&customer, id).await;
                        }
                    }
                }

                let available = fx.available_seats().await;
                let active = fx.active_tickets().await;
                assert!(available >= 0 && available <= capacity);
                assert_eq!(i64::from(available) + active, i64::from(capacity));
            }
        });
    }
}
