//! Venue and event management, including the edit flow that notifies holders.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::changes::{ChangeSet, Placement};
use super::notifier::{self, Dispatched};
use super::schedule::{self, Countdown};
use super::{non_empty, InputError, Ticketing, TicketingError};
use crate::models::{
    Actor, CategoryId, Event, EventId, EventPatch, NewEvent, NewVenue, Venue, VenueId,
};

#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub venue_id: VenueId,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    pub event: Event,
    pub available_seats: i32,
    pub countdown: Countdown,
    pub countdown_label: String,
}

/// Result of an accepted edit. `notification` is set only for significant changes.
#[derive(Debug, Clone, Serialize)]
pub struct EventEdit {
    pub event: Event,
    pub notification: Option<Dispatched>,
}

fn require_organizer(actor: &Actor, action: &'static str) -> Result<(), TicketingError> {
    if actor.is_organizer() {
        Ok(())
    } else {
        Err(TicketingError::Forbidden(action))
    }
}

fn require_event_owner(actor: &Actor, event: &Event) -> Result<(), TicketingError> {
    if event.organizer_id == actor.user_id {
        Ok(())
    } else {
        Err(TicketingError::Forbidden(
            "only the event organizer can change this event",
        ))
    }
}

fn optional_non_empty(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<String>, InputError> {
    value.map(|v| non_empty(field, v)).transpose()
}

impl Ticketing {
    pub async fn create_venue(&self, actor: &Actor, venue: NewVenue) -> Result<Venue, TicketingError> {
        require_organizer(actor, "only organizers can create venues")?;
        if venue.capacity <= 0 {
            return Err(InputError::NonPositiveCapacity(venue.capacity).into());
        }
        let venue = NewVenue {
            name: non_empty("name", venue.name)?,
            ..venue
        };
        Ok(self.store.insert_venue(venue).await?)
    }

    pub async fn venue(&self, venue_id: VenueId) -> Result<Venue, TicketingError> {
        self.store
            .venue(venue_id)
            .await?
            .ok_or(TicketingError::NotFound("venue"))
    }

    pub async fn delete_venue(&self, actor: &Actor, venue_id: VenueId) -> Result<(), TicketingError> {
        require_organizer(actor, "only organizers can delete venues")?;
        if self.store.delete_venue(venue_id).await? {
            Ok(())
        } else {
            Err(TicketingError::NotFound("venue"))
        }
    }

    pub async fn create_event(&self, actor: &Actor, draft: EventDraft) -> Result<Event, TicketingError> {
        require_organizer(actor, "only organizers can create events")?;
        let title = non_empty("title", draft.title)?;
        let description = non_empty("description", draft.description)?;
        let now = self.clock.now();
        if !schedule::is_schedulable(draft.scheduled_at, now) {
            return Err(InputError::ScheduleNotInFuture.into());
        }
        self.venue(draft.venue_id).await?;

        let event = NewEvent {
            title,
            description,
            scheduled_at: draft.scheduled_at,
            venue_id: draft.venue_id,
            organizer_id: actor.user_id,
            category_id: draft.category_id,
        };
        Ok(self.store.insert_event(event, now).await?)
    }

    pub async fn upcoming_events(&self) -> Result<Vec<Event>, TicketingError> {
        Ok(self.store.upcoming_events(self.clock.now()).await?)
    }

    pub async fn event_detail(&self, event_id: EventId) -> Result<EventDetail, TicketingError> {
        let event = self.event(event_id).await?;
        let available_seats = self.available_seats(&event).await?;
        let countdown = Countdown::until(event.scheduled_at, self.clock.now());
        Ok(EventDetail {
            event,
            available_seats,
            countdown,
            countdown_label: countdown.to_string(),
        })
    }

    /// Applies an organizer's edit and, when date, time or venue changed,
    /// notifies everyone holding tickets at that moment.
    ///
    /// The edit and the notification commit together under the event lock,
    /// so no purchase can slip in between the holder snapshot and the write.
    pub async fn edit_event(
        &self,
        actor: &Actor,
        event_id: EventId,
        patch: EventPatch,
    ) -> Result<EventEdit, TicketingError> {
        let patch = EventPatch {
            title: optional_non_empty("title", patch.title)?,
            description: optional_non_empty("description", patch.description)?,
            ..patch
        };
        let now = self.clock.now();

        let mut unit = self.lock_event(event_id).await?;
        let current = unit.event().clone();
        require_event_owner(actor, &current)?;
        if current.has_occurred(now) {
            return Err(TicketingError::EventAlreadyOccurred);
        }
        if patch.scheduled_at != current.scheduled_at
            && !schedule::is_schedulable(patch.scheduled_at, now)
        {
            return Err(InputError::ScheduleNotInFuture.into());
        }

        let venue = self.venue(patch.venue_id).await?;
        if venue.id != current.venue_id {
            let sold = unit.sold_quantity(None).await?;
            if venue.capacity < sold {
                return Err(TicketingError::VenueTooSmall {
                    capacity: venue.capacity,
                    sold,
                });
            }
        }

        let changes = ChangeSet::between(
            &Placement::from(&current),
            &Placement {
                scheduled_at: patch.scheduled_at,
                venue_id: patch.venue_id,
            },
        );

        let event = unit.update_event(&patch, now).await?;
        let notification = if changes.is_significant() {
            let summary = changes.summary(&venue.name);
            Some(notifier::notify_event_updated(unit.as_mut(), &summary, now).await?)
        } else {
            None
        };
        unit.commit().await?;

        Ok(EventEdit {
            event,
            notification,
        })
    }

    pub async fn delete_event(&self, actor: &Actor, event_id: EventId) -> Result<(), TicketingError> {
        let event = self.event(event_id).await?;
        require_event_owner(actor, &event)?;
        if self.store.delete_event(event_id).await? {
            Ok(())
        } else {
            Err(TicketingError::NotFound("event"))
        }
    }
}
