#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use eventhub_server::models::{Actor, Event, NewVenue, UserId, Venue};
use eventhub_server::store::{MemoryStore, Store};
use eventhub_server::ticketing::{EventDraft, FixedClock, Ticketing};

/// 2025-06-01 09:00 in UTC-3.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// 2025-06-15 20:00 in UTC-3.
pub fn show_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 23, 0, 0).unwrap()
}

pub struct Fixture {
    pub store: Arc<dyn Store>,
    pub ticketing: Ticketing,
    pub organizer: Actor,
    pub venue: Venue,
    pub event: Event,
}

pub fn new_venue(name: &str, capacity: i32) -> NewVenue {
    NewVenue {
        name: name.to_string(),
        address: "Av. Corrientes 1234".to_string(),
        city: "Buenos Aires".to_string(),
        capacity,
        contact: "boleteria@example.com".to_string(),
    }
}

pub fn buyer() -> Actor {
    Actor::regular(UserId::new())
}

pub async fn fixture(capacity: i32) -> Fixture {
    fixture_with(Arc::new(MemoryStore::new()), capacity).await
}

/// One venue of `capacity` seats and one upcoming event on it, backed by `store`.
pub async fn fixture_with(store: Arc<dyn Store>, capacity: i32) -> Fixture {
    let ticketing = Ticketing::new(store.clone(), Arc::new(FixedClock::new(now())));
    let organizer = Actor::organizer(UserId::new());

    let venue = ticketing
        .create_venue(&organizer, new_venue("Teatro Gran Rex", capacity))
        .await
        .unwrap();
    let event = ticketing
        .create_event(
            &organizer,
            EventDraft {
                title: "Recital de prueba".to_string(),
                description: "Una noche de tango".to_string(),
                scheduled_at: show_time(),
                venue_id: venue.id,
                category_id: None,
            },
        )
        .await
        .unwrap();

    Fixture {
        store,
        ticketing,
        organizer,
        venue,
        event,
    }
}

impl Fixture {
    pub async fn sold(&self) -> i32 {
        self.store.sold_quantity(self.event.id).await.unwrap()
    }

    pub async fn held_by(&self, actor: &Actor) -> i32 {
        self.store
            .user_quantity(actor.user_id, self.event.id)
            .await
            .unwrap()
    }
}
