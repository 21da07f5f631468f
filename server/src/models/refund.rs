use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{EventId, RefundRequestId, UserId};

/// A ticket holder asking the organizer to take a ticket back.
///
/// `approved` is `None` while the request is pending; the ticket is only
/// deleted once the organizer approves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RefundRequest {
    pub id: RefundRequestId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub ticket_code: String,
    pub reason: String,
    pub approved: Option<bool>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefundRequest {
    pub fn is_pending(&self) -> bool {
        self.approved.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewRefundRequest {
    pub user_id: UserId,
    pub ticket_code: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
