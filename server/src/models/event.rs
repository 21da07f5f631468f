use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{CategoryId, EventId, UserId, VenueId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub venue_id: VenueId,
    pub organizer_id: UserId,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Strictly after `now`; an event scheduled for this very instant is no longer upcoming.
    pub fn is_future(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at > now
    }

    pub fn has_occurred(&self, now: DateTime<Utc>) -> bool {
        !self.is_future(now)
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub venue_id: VenueId,
    pub organizer_id: UserId,
    pub category_id: Option<CategoryId>,
}

/// Fields an organizer may change on an existing event.
///
/// `scheduled_at` and `venue_id` are always present because the edit form
/// resubmits them; the descriptive fields keep their current value when `None`.
#[derive(Debug, Clone)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub scheduled_at: DateTime<Utc>,
    pub venue_id: VenueId,
}

impl EventPatch {
    pub fn apply(&self, event: &Event, now: DateTime<Utc>) -> Event {
        Event {
            title: self.title.clone().unwrap_or_else(|| event.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| event.description.clone()),
            category_id: self.category_id.or(event.category_id),
            scheduled_at: self.scheduled_at,
            venue_id: self.venue_id,
            updated_at: now,
            ..event.clone()
        }
    }
}
