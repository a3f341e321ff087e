mod common;

use chrono::Duration;
use futures::future::join_all;
use uuid::Uuid;

use common::{fixture, seat_at};
use showtime_booking::error::BookingError;
use showtime_booking::models::Caller;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_of_one_seat_have_single_winner() {
    let fx = fixture(10, Duration::hours(5)).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = fx.service.clone();
            let showtime_id = fx.showtime.id;
            tokio::spawn(async move {
                service
                    .book(&Caller::customer(Uuid::new_v4()), showtime_id, "A", "01")
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let taken = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::SeatTaken(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(taken, 15);
    assert_eq!(fx.active_tickets().await, 1);
    assert_eq!(fx.available_seats().await, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_seat_contention_reports_seat_taken() {
    let fx = fixture(1, Duration::hours(5)).await;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = fx.service.clone();
            let showtime_id = fx.showtime.id;
            tokio::spawn(async move {
                service
                    .book(&Caller::customer(Uuid::new_v4()), showtime_id, "A", "01")
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(BookingError::SeatTaken(label)) if label == "A01")));
    assert_eq!(fx.available_seats().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_never_exceed_capacity() {
    let fx = fixture(5, Duration::hours(5)).await;

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let service = fx.service.clone();
            let showtime_id = fx.showtime.id;
            let (row, number) = seat_at(i);
            tokio::spawn(async move {
                service
                    .book(&Caller::customer(Uuid::new_v4()), showtime_id, &row, &number)
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(BookingError::SoldOut(_)))));
    assert_eq!(fx.available_seats().await, 0);
    assert_eq!(fx.active_tickets().await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancels_release_once() {
    let fx = fixture(10, Duration::hours(5)).await;
    let customer = Caller::customer(Uuid::new_v4());
    let receipt = fx.service.book(&customer, fx.showtime.id, "A", "01").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = fx.service.clone();
            let customer = customer.clone();
            let booking_id = receipt.booking.id;
            tokio::spawn(async move { service.cancel(&customer, booking_id).await })
        })
        .collect();

    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(BookingError::AlreadyCancelled(_))))
            .count(),
        7
    );
    assert_eq!(fx.available_seats().await, 10);
}
