use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::VenueId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub capacity: i32,
    pub contact: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVenue {
    pub name: String,
    pub address: String,
    pub city: String,
    pub capacity: i32,
    pub contact: String,
}
