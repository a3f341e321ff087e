mod common;

use chrono::Duration;
use uuid::Uuid;

use common::fixture;
use showtime_booking::error::BookingError;
use showtime_booking::models::{
    BookingPaymentStatus, BookingStatus, Caller, PaymentMethod, PaymentStatus, SeatStatus, TicketStatus,
};
use showtime_booking::store::FailPoint;

#[tokio::test]
async fn booking_claims_seat_and_decrements_counter() {
    let fx = fixture(10, Duration::hours(5)).await;
    let customer = Uuid::new_v4();

    let receipt = fx
        .service
        .book(&Caller::customer(customer), fx.showtime.id, "A", "05")
        .await
        .unwrap();

    assert_eq!(receipt.available_seats, 9);
    assert_eq!(receipt.seat.status, SeatStatus::Booked);
    assert_eq!(receipt.booking.seats[0].0, "A05");
    assert_eq!(receipt.booking.total_amount, 1200);
    assert_eq!(receipt.booking.status, BookingStatus::Confirmed);
    assert_eq!(receipt.booking.payment_status, BookingPaymentStatus::Paid);
    assert_eq!(receipt.booking.ticket.status, TicketStatus::Confirmed);
    assert_eq!(receipt.booking.ticket.customer_id, customer);
    assert_eq!(receipt.booking.payment.method, PaymentMethod::Online);
    assert_eq!(receipt.booking.payment.status, PaymentStatus::Completed);
    assert_eq!(receipt.booking.payment.amount, 1200);

    assert_eq!(fx.available_seats().await, 9);
    assert_eq!(fx.active_tickets().await, 1);
    assert_eq!(fx.seat("A", "05").await.unwrap().status, SeatStatus::Booked);
}

#[tokio::test]
async fn second_booking_of_same_seat_is_rejected() {
    let fx = fixture(10, Duration::hours(5)).await;
    fx.service
        .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "B", "01")
        .await
        .unwrap();

    let err = fx
        .service
        .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "B", "01")
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::SeatTaken(ref label) if label == "B01"));
    assert_eq!(fx.available_seats().await, 9);
}

#[tokio::test]
async fn unknown_showtime_and_anonymous_caller_are_rejected() {
    let fx = fixture(10, Duration::hours(5)).await;

    let missing = Uuid::new_v4();
    let err = fx
        .service
        .book(&Caller::customer(Uuid::new_v4()), missing, "A", "01")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { entity: "showtime", id } if id == missing));

    let err = fx
        .service
        .book(&Caller::anonymous(), fx.showtime.id, "A", "01")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Unauthorized));
    assert!(fx.seat("A", "01").await.is_none());
}

#[tokio::test]
async fn sold_out_showtime_rejects_booking() {
    let fx = fixture(1, Duration::hours(5)).await;
    fx.service
        .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "A", "01")
        .await
        .unwrap();

    let err = fx
        .service
        .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "A", "02")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SoldOut(id) if id == fx.showtime.id));
    assert_eq!(fx.available_seats().await, 0);
}

#[tokio::test]
async fn failures_after_claim_leave_no_trace() {
    for point in [FailPoint::InsertBooking, FailPoint::AdjustCapacity, FailPoint::Commit] {
        let fx = fixture(10, Duration::hours(5)).await;
        fx.store.fail_next(point);

        let err = fx
            .service
            .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "C", "07")
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::BookingFailed(_)), "{point:?}: {err:?}");
        assert!(fx.seat("C", "07").await.is_none(), "{point:?}");
        assert_eq!(fx.available_seats().await, 10, "{point:?}");
        assert_eq!(fx.active_tickets().await, 0, "{point:?}");

        // место снова доступно
        fx.service
            .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "C", "07")
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn failed_seat_claim_changes_nothing() {
    let fx = fixture(10, Duration::hours(5)).await;
    fx.service
        .seed_seats(fx.showtime.id, &["A".to_string()], 2)
        .await
        .unwrap();
    let customer = Caller::customer(Uuid::new_v4());

    // новая координата: сбой вставки строки места
    fx.store.fail_next(FailPoint::InsertSeat);
    let err = fx.service.book(&customer, fx.showtime.id, "B", "01").await.unwrap_err();
    assert!(matches!(err, BookingError::Storage(_)), "{err:?}");
    assert!(fx.seat("B", "01").await.is_none());

    // существующее место: сбой условного апдейта по версии
    fx.store.fail_next(FailPoint::UpdateSeat);
    let err = fx.service.book(&customer, fx.showtime.id, "A", "01").await.unwrap_err();
    assert!(matches!(err, BookingError::Storage(_)), "{err:?}");
    let seat = fx.seat("A", "01").await.unwrap();
    assert_eq!(seat.status, SeatStatus::Available);
    assert_eq!(seat.version, 0);

    assert_eq!(fx.available_seats().await, 10);
    assert_eq!(fx.active_tickets().await, 0);
}

#[tokio::test]
async fn customer_sees_own_bookings_newest_first() {
    let fx = fixture(10, Duration::hours(5)).await;
    let customer = Caller::customer(Uuid::new_v4());

    let first = fx.service.book(&customer, fx.showtime.id, "A", "01").await.unwrap();
    fx.clock.advance(Duration::minutes(1));
    let second = fx.service.book(&customer, fx.showtime.id, "A", "02").await.unwrap();
    fx.service
        .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "A", "03")
        .await
        .unwrap();

    let bookings = fx.service.bookings_for_customer(&customer).await.unwrap();
    let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![second.booking.id, first.booking.id]);
}

#[tokio::test]
async fn hold_blocks_others_until_it_expires() {
    let fx = fixture(10, Duration::hours(5)).await;
    let holder = Caller::customer(Uuid::new_v4());
    let other = Caller::customer(Uuid::new_v4());

    let seat = fx.service.hold_seat(&holder, fx.showtime.id, "D", "04").await.unwrap();
    assert_eq!(seat.status, SeatStatus::Reserved);
    assert_eq!(seat.lock_expires_at, Some(fx.now + Duration::minutes(15)));

    let err = fx.service.book(&other, fx.showtime.id, "D", "04").await.unwrap_err();
    assert!(matches!(err, BookingError::SeatTaken(_)));
    assert!(!fx.service.release_hold(&other, fx.showtime.id, "D", "04").await.unwrap());

    fx.clock.advance(Duration::minutes(16));
    assert_eq!(fx.service.sweep_expired_holds().await.unwrap(), 1);
    fx.service.book(&other, fx.showtime.id, "D", "04").await.unwrap();
}

#[tokio::test]
async fn holder_can_book_or_release_own_hold() {
    let fx = fixture(10, Duration::hours(5)).await;
    let holder = Caller::customer(Uuid::new_v4());

    fx.service.hold_seat(&holder, fx.showtime.id, "E", "01").await.unwrap();
    assert!(fx.service.release_hold(&holder, fx.showtime.id, "E", "01").await.unwrap());
    assert_eq!(fx.seat("E", "01").await.unwrap().status, SeatStatus::Available);

    fx.service.hold_seat(&holder, fx.showtime.id, "E", "02").await.unwrap();
    let receipt = fx.service.book(&holder, fx.showtime.id, "E", "02").await.unwrap();
    assert_eq!(receipt.seat.status, SeatStatus::Booked);
    assert_eq!(receipt.seat.locked_by, None);
}

#[tokio::test]
async fn availability_repairs_drifted_counter() {
    let fx = fixture(10, Duration::hours(5)).await;
    fx.service
        .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "A", "01")
        .await
        .unwrap();

    let mut drifted = fx.showtime.clone();
    drifted.available_seats = 3;
    fx.store.insert_showtime(drifted).await;

    let availability = fx.service.get_availability(fx.showtime.id).await.unwrap();
    assert!(availability.repaired);
    assert_eq!(availability.booked, 1);
    assert_eq!(availability.available, 9);
    assert_eq!(fx.available_seats().await, 9);
}

#[tokio::test]
async fn seeding_creates_available_seats_once() {
    let fx = fixture(50, Duration::hours(5)).await;
    let rows = vec!["A".to_string(), "B".to_string()];

    assert_eq!(fx.service.seed_seats(fx.showtime.id, &rows, 10).await.unwrap(), 20);
    assert_eq!(fx.service.seed_seats(fx.showtime.id, &rows, 10).await.unwrap(), 0);
    assert_eq!(fx.seat("B", "10").await.unwrap().status, SeatStatus::Available);

    let receipt = fx
        .service
        .book(&Caller::customer(Uuid::new_v4()), fx.showtime.id, "B", "10")
        .await
        .unwrap();
    assert_eq!(receipt.seat.version, 1);
}
