use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{EventId, NotificationId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "notification_priority", rename_all = "UPPERCASE")]
pub enum NotificationPriority {
    High,
    #[default]
    Normal,
    Low,
}

/// Notification content. The read flag lives on each recipient link, see [`InboxEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: NotificationId,
    /// Cleared if the event is deleted later on.
    pub event_id: Option<EventId>,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
}

/// A notification as seen by one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct InboxEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub notification: Notification,
    pub is_read: bool,
}
