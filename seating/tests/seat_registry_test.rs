//! Seat registry against the in-memory document store.
//!
//! Run with: `cargo test -p seatbook --test seat_registry_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use common::harness;
use seatbook::seats::{SeatSource, default_layout};
use seatbook::{SeatNumber, SeatStatus};
use seatbook_core::document::{DocumentId, Fields, Value};
use seatbook_core::identity::UserId;
use std::collections::BTreeSet;

fn seat_fields(number: &str, status: &str) -> Fields {
    Fields::from([
        ("seatNumber".to_string(), Value::from(number)),
        ("status".to_string(), Value::from(status)),
    ])
}

#[tokio::test]
async fn empty_collection_is_bootstrapped_with_full_grid() {
    let h = harness();

    let source = h.app.seats.load().await;

    assert_eq!(source, SeatSource::Bootstrapped);
    assert_eq!(h.db.len("seats"), 16);

    let stored: BTreeSet<String> = h
        .db
        .documents("seats")
        .iter()
        .filter_map(|doc| doc.get_str("seatNumber").map(ToString::to_string))
        .collect();
    let expected: BTreeSet<String> = ["A", "B", "C", "D"]
        .iter()
        .flat_map(|row| (1..=4).map(move |col| format!("{row}{col}")))
        .collect();
    assert_eq!(stored, expected);

    let seats = h.app.seats.seats().await;
    assert_eq!(seats.len(), 16);
    assert!(seats.iter().all(|seat| seat.status == SeatStatus::Available));
    assert!(h.db.documents("seats").iter().all(|doc| doc.get_timestamp("createdAt").is_some()));
}

#[tokio::test]
async fn second_load_reads_existing_seats() {
    let h = harness();
    h.app.seats.load().await;

    assert_eq!(h.app.seats.load().await, SeatSource::Store);
    assert_eq!(h.db.len("seats"), 16);
}

#[tokio::test]
async fn seats_come_back_in_grid_order() {
    let h = harness();
    for (id, number) in [("z", "D4"), ("y", "A1"), ("x", "B3")] {
        h.db.insert("seats", DocumentId::new(id), seat_fields(number, "available"));
    }

    h.app.seats.load().await;

    let order: Vec<String> = h
        .app
        .seats
        .seats()
        .await
        .iter()
        .map(|seat| seat.seat_number.to_string())
        .collect();
    assert_eq!(order, ["A1", "B3", "D4"]);
}

#[tokio::test]
async fn read_failure_falls_back_to_offline_layout() {
    let h = harness();
    h.db.fail_reads("backend offline");

    let source = h.app.seats.load().await;

    assert_eq!(source, SeatSource::Fallback);
    assert_eq!(h.app.seats.seats().await, default_layout());
    assert!(h.app.seats.error().await.unwrap().contains("backend offline"));
    assert!(!h.app.seats.is_loading().await);
    assert_eq!(h.db.len("seats"), 0);

    h.app.seats.clear_error().await;
    assert!(h.app.seats.error().await.is_none());
}

#[tokio::test]
async fn bootstrap_write_failure_falls_back_without_partial_seats() {
    let h = harness();
    h.db.fail_writes("missing or insufficient permissions");

    let source = h.app.seats.load().await;

    assert_eq!(source, SeatSource::Fallback);
    assert_eq!(h.db.len("seats"), 0);
    assert_eq!(h.app.seats.available().await.len(), 16);
    let seat = h.app.seats.seat(&"C2".parse().unwrap()).await.unwrap();
    assert_eq!(seat.id.as_str(), "C2");
}

#[tokio::test]
async fn set_status_records_and_clears_holder() {
    let h = harness();
    h.app.seats.load().await;
    let a1: SeatNumber = "A1".parse().unwrap();
    let until = common::new_year_2024() + chrono::Duration::hours(3);
    let user = UserId::new("u-ada");

    h.app
        .seats
        .set_status(&a1, SeatStatus::Occupied, Some(&user), Some(until))
        .await
        .unwrap();
    h.app.seats.load().await;

    let seat = h.app.seats.seat(&a1).await.unwrap();
    assert_eq!(seat.status, SeatStatus::Occupied);
    assert_eq!(seat.reserved_by, Some(user));
    assert_eq!(seat.reserved_until, Some(until));
    assert_eq!(h.app.seats.occupied().await.len(), 1);
    assert_eq!(h.app.seats.available().await.len(), 15);

    h.app
        .seats
        .set_status(&a1, SeatStatus::Available, None, None)
        .await
        .unwrap();
    h.app.seats.load().await;

    let seat = h.app.seats.seat(&a1).await.unwrap();
    assert_eq!(seat.status, SeatStatus::Available);
    assert!(seat.reserved_by.is_none());
    assert!(seat.reserved_until.is_none());

    let doc = h.db.document("seats", &seat.id).unwrap();
    assert_eq!(doc.get("reservedBy"), Some(&Value::Null));
    assert!(doc.get_timestamp("updatedAt").is_some());
}

#[tokio::test]
async fn set_status_on_unknown_seat_is_a_no_op() {
    let h = harness();
    h.db.insert("seats", DocumentId::new("s1"), seat_fields("A1", "available"));
    let writes_before = h.db.write_count();

    h.app
        .seats
        .set_status(&"D4".parse().unwrap(), SeatStatus::Occupied, None, None)
        .await
        .unwrap();

    assert_eq!(h.db.write_count(), writes_before);
    assert_eq!(
        h.db.document("seats", &DocumentId::new("s1")).unwrap().get_str("status"),
        Some("available")
    );
}

#[tokio::test]
async fn set_status_propagates_store_failures() {
    let h = harness();
    h.app.seats.load().await;
    h.db.fail_writes("denied");

    let result = h
        .app
        .seats
        .set_status(&"B1".parse().unwrap(), SeatStatus::Occupied, None, None)
        .await;

    assert!(matches!(result, Err(seatbook::SeatbookError::Write(_))));
}
