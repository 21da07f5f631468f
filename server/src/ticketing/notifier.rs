//! Notification dispatcher.
//!
//! Notifications are created and fanned out to the event's current ticket
//! holders inside the caller's [`EventUnit`], so the content and every
//! recipient link are committed together or not at all.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{inventory, Ticketing, TicketingError};
use crate::models::{
    Actor, EventId, InboxEntry, NewNotification, Notification, NotificationId,
    NotificationPriority, UserId,
};
use crate::store::{EventUnit, StoreResult};

pub const EVENT_UPDATED_TITLE: &str = "Cambios en el evento";
const EVENT_UPDATED_PREFIX: &str = "Se modificaron los siguientes datos del evento:";

#[derive(Debug, Clone, Serialize)]
pub struct Dispatched {
    pub notification: Notification,
    pub recipients: BTreeSet<UserId>,
}

pub fn event_updated_message(change_summary: &str) -> String {
    format!("{EVENT_UPDATED_PREFIX}\n{change_summary}")
}

/// Creates one high-priority "event changed" notification for the locked event.
///
/// Does not deduplicate: every call creates a new notification.
pub async fn notify_event_updated(
    unit: &mut dyn EventUnit,
    change_summary: &str,
    now: DateTime<Utc>,
) -> StoreResult<Dispatched> {
    let draft = NewNotification {
        title: EVENT_UPDATED_TITLE.to_string(),
        message: event_updated_message(change_summary),
        priority: NotificationPriority::High,
        created_at: now,
    };
    fan_out(unit, draft).await
}

async fn fan_out(unit: &mut dyn EventUnit, draft: NewNotification) -> StoreResult<Dispatched> {
    let recipients = inventory::holders(unit).await?;
    let notification = unit.insert_notification(draft, &recipients).await?;
    Ok(Dispatched {
        notification,
        recipients,
    })
}

/// An organizer-authored notice for everyone holding tickets.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
}

impl Ticketing {
    /// Manual notifications refuse exact (title, message) repeats for the same event.
    pub async fn publish_notification(
        &self,
        actor: &Actor,
        event_id: EventId,
        draft: NotificationDraft,
    ) -> Result<Dispatched, TicketingError> {
        let title = super::non_empty("title", draft.title)?;
        let message = super::non_empty("message", draft.message)?;

        let mut unit = self.lock_event(event_id).await?;
        if unit.event().organizer_id != actor.user_id {
            return Err(TicketingError::Forbidden(
                "only the organizer can notify ticket holders",
            ));
        }
        if unit.notification_exists(&title, &message).await? {
            return Err(TicketingError::DuplicateNotification);
        }

        let dispatched = fan_out(
            unit.as_mut(),
            NewNotification {
                title,
                message,
                priority: draft.priority,
                created_at: self.clock.now(),
            },
        )
        .await?;
        unit.commit().await?;
        Ok(dispatched)
    }

    pub async fn event_notifications(
        &self,
        actor: &Actor,
        event_id: EventId,
    ) -> Result<Vec<Notification>, TicketingError> {
        let event = self.event(event_id).await?;
        if event.organizer_id != actor.user_id {
            return Err(TicketingError::Forbidden(
                "only the organizer can list event notifications",
            ));
        }
        Ok(self.store.event_notifications(event_id).await?)
    }

    pub async fn inbox(&self, actor: &Actor) -> Result<Vec<InboxEntry>, TicketingError> {
        Ok(self.store.inbox(actor.user_id).await?)
    }

    pub async fn unread_count(&self, actor: &Actor) -> Result<i64, TicketingError> {
        Ok(self.store.unread_count(actor.user_id).await?)
    }

    pub async fn mark_read(
        &self,
        actor: &Actor,
        notification: NotificationId,
    ) -> Result<(), TicketingError> {
        if self.store.mark_read(notification, actor.user_id).await? {
            Ok(())
        } else {
            Err(TicketingError::NotFound("notification"))
        }
    }
}
