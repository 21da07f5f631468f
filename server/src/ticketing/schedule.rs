//! Calendar rules in the business timezone (UTC-3, no daylight saving).

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

pub const BUSINESS_UTC_OFFSET_HOURS: i64 = -3;

pub fn local(at: DateTime<Utc>) -> NaiveDateTime {
    at.naive_utc() + Duration::hours(BUSINESS_UTC_OFFSET_HOURS)
}

pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    local(at).date()
}

/// New events must fall on a later calendar day than today.
pub fn is_schedulable(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    local_date(scheduled_at) > local_date(now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "days", rename_all = "snake_case")]
pub enum Countdown {
    Finished,
    Today,
    DaysLeft(i64),
}

impl Countdown {
    pub fn until(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days = (local_date(scheduled_at) - local_date(now)).num_days();
        match days {
            d if d < 0 => Countdown::Finished,
            0 => Countdown::Today,
            d => Countdown::DaysLeft(d),
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Countdown::Finished => f.write_str("Evento finalizado"),
            Countdown::Today => f.write_str("Es hoy"),
            Countdown::DaysLeft(1) => f.write_str("Falta 1 día"),
            Countdown::DaysLeft(days) => write!(f, "Faltan {days} días"),
        }
    }
}
