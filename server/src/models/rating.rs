use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{EventId, RatingId, UserId};

/// Lowest and highest score a user can give an event.
pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Rating {
    pub id: RatingId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub title: String,
    /// Free text; may be empty.
    pub text: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub event_id: EventId,
    pub user_id: UserId,
    pub title: String,
    pub text: String,
    pub score: i32,
    pub created_at: DateTime<Utc>,
}
