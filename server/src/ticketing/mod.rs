//! Ticket inventory, purchase limits and event-change notifications.
//!
//! [`Ticketing`] is the entry point used by the HTTP handlers. It never logs
//! or renders; every refusal comes back as a [`TicketingError`].

use std::sync::Arc;

use crate::models::{Event, EventId};
use crate::store::{EventUnit, Store};

pub mod capacity;
pub mod changes;
pub mod clock;
pub mod error;
pub mod events;
pub mod inventory;
pub mod notifier;
pub mod quota;
pub mod ratings;
pub mod refunds;
pub mod schedule;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{InputError, TicketingError};
pub use events::{EventDetail, EventDraft, EventEdit};
pub use notifier::{Dispatched, NotificationDraft};
pub use quota::{LimitCheck, MAX_TICKETS_PER_USER};
pub use ratings::{RatingDraft, RatingSummary};
pub use refunds::RefundDraft;

#[derive(Clone)]
pub struct Ticketing {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl Ticketing {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn event(&self, event_id: EventId) -> Result<Event, TicketingError> {
        self.store
            .event(event_id)
            .await?
            .ok_or(TicketingError::NotFound("event"))
    }

    async fn lock_event(&self, event_id: EventId) -> Result<Box<dyn EventUnit>, TicketingError> {
        self.store
            .lock_event(event_id)
            .await?
            .ok_or(TicketingError::NotFound("event"))
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, InputError> {
    if value.trim().is_empty() {
        Err(InputError::EmptyField(field))
    } else {
        Ok(value)
    }
}
