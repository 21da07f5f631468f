use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{EventId, TicketId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "ticket_type", rename_all = "UPPERCASE")]
pub enum TicketType {
    General,
    Vip,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::General => "GENERAL",
            TicketType::Vip => "VIP",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTicketType(pub String);

impl FromStr for TicketType {
    type Err = UnknownTicketType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GENERAL" => Ok(TicketType::General),
            "VIP" => Ok(TicketType::Vip),
            _ => Err(UnknownTicketType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: TicketId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub quantity: i32,
    pub ticket_type: TicketType,
    pub ticket_code: String,
    pub buy_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: UserId,
    pub quantity: i32,
    pub ticket_type: TicketType,
    pub ticket_code: String,
    pub buy_date: DateTime<Utc>,
}
