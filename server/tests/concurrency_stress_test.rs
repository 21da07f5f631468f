//! Concurrent buyers racing for the same event must never oversell it or
//! push a single user past the per-event ticket limit.

mod common;

use common::{buyer, fixture};
use eventhub_server::ticketing::{TicketingError, MAX_TICKETS_PER_USER};
use futures::future::join_all;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buyers_never_oversell() {
    const CAPACITY: i32 = 10;
    const QUANTITY: i32 = 3;
    const BUYERS: usize = 20;

    let f = fixture(CAPACITY).await;

    let handles = (0..BUYERS).map(|_| {
        let ticketing = f.ticketing.clone();
        let event_id = f.event.id;
        tokio::spawn(async move {
            ticketing
                .purchase(&buyer(), event_id, QUANTITY, "GENERAL")
                .await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(TicketingError::CapacityExceeded { .. })))
        .count();

    assert_eq!(accepted, (CAPACITY / QUANTITY) as usize);
    assert_eq!(accepted + refused, BUYERS);
    assert_eq!(f.sold().await, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_single_seat_purchases_fill_exactly() {
    const CAPACITY: i32 = 10;
    let f = fixture(CAPACITY).await;

    let handles = (0..50).map(|_| {
        let ticketing = f.ticketing.clone();
        let event_id = f.event.id;
        tokio::spawn(async move { ticketing.purchase(&buyer(), event_id, 1, "VIP").await })
    });
    let accepted = join_all(handles)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count();

    assert_eq!(accepted, CAPACITY as usize);
    assert_eq!(f.sold().await, CAPACITY);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_user_racing_themselves_stays_within_limit() {
    let f = fixture(100).await;
    let user = buyer();

    let handles = (0..10).map(|_| {
        let ticketing = f.ticketing.clone();
        let event_id = f.event.id;
        tokio::spawn(async move { ticketing.purchase(&user, event_id, 1, "GENERAL").await })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, MAX_TICKETS_PER_USER as usize);
    assert!(results.iter().all(|r| matches!(
        r,
        Ok(_) | Err(TicketingError::AccumulatedLimitExceeded { .. })
    )));
    assert_eq!(f.held_by(&user).await, MAX_TICKETS_PER_USER);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_edits_and_purchases_race_without_overselling() {
    const CAPACITY: i32 = 8;
    let f = fixture(CAPACITY).await;

    let mut owners = Vec::new();
    for _ in 0..4 {
        let owner = buyer();
        let ticket = f
            .ticketing
            .purchase(&owner, f.event.id, 1, "GENERAL")
            .await
            .unwrap();
        owners.push((owner, ticket.id));
    }

    let edits = owners.into_iter().map(|(owner, ticket_id)| {
        let ticketing = f.ticketing.clone();
        tokio::spawn(async move {
            ticketing
                .edit_ticket(&owner, ticket_id, 3, "GENERAL")
                .await
                .map(|_| ())
        })
    });
    let purchases = (0..4).map(|_| {
        let ticketing = f.ticketing.clone();
        let event_id = f.event.id;
        tokio::spawn(async move {
            ticketing
                .purchase(&buyer(), event_id, 2, "GENERAL")
                .await
                .map(|_| ())
        })
    });
    let handles: Vec<_> = edits.chain(purchases).collect();
    for joined in join_all(handles).await {
        match joined.unwrap() {
            Ok(()) | Err(TicketingError::CapacityExceeded { .. }) => {}
            Err(other) => panic!("unexpected refusal: {other}"),
        }
    }

    assert!(f.sold().await <= CAPACITY);
}
