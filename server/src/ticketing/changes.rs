//! Decides whether an event edit matters to ticket holders.
//!
//! Only the calendar date, the time of day (to the minute) and the venue
//! count. Both dates and times are compared in the business timezone.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use super::schedule;
use crate::models::{Event, VenueId};

/// Where and when an event takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub scheduled_at: DateTime<Utc>,
    pub venue_id: VenueId,
}

impl From<&Event> for Placement {
    fn from(event: &Event) -> Self {
        Self {
            scheduled_at: event.scheduled_at,
            venue_id: event.venue_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSet {
    new_local: NaiveDateTime,
    pub date_changed: bool,
    pub time_changed: bool,
    pub venue_changed: bool,
}

impl ChangeSet {
    pub fn between(old: &Placement, new: &Placement) -> Self {
        let old_local = schedule::local(old.scheduled_at);
        let new_local = schedule::local(new.scheduled_at);
        Self {
            new_local,
            date_changed: old_local.date() != new_local.date(),
            time_changed: (old_local.hour(), old_local.minute())
                != (new_local.hour(), new_local.minute()),
            venue_changed: old.venue_id != new.venue_id,
        }
    }

    pub fn is_significant(&self) -> bool {
        self.date_changed || self.time_changed || self.venue_changed
    }

    /// One line per changed dimension: date, then time, then venue.
    pub fn summary(&self, new_venue_name: &str) -> String {
        let mut lines = Vec::with_capacity(3);
        if self.date_changed {
            lines.push(format!("Nueva fecha: {}", self.new_local.format("%d/%m/%Y")));
        }
        if self.time_changed {
            lines.push(format!("Nueva hora: {}", self.new_local.format("%H:%M")));
        }
        if self.venue_changed {
            lines.push(format!("Nuevo lugar: {new_venue_name}"));
        }
        lines.join("\n")
    }
}

pub fn is_significant(old: &Placement, new: &Placement) -> bool {
    ChangeSet::between(old, new).is_significant()
}
