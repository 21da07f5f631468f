use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identity of an authenticated user, issued by the auth provider.
    UserId
);
uuid_id!(VenueId);
uuid_id!(EventId);
uuid_id!(CategoryId);
uuid_id!(TicketId);
uuid_id!(NotificationId);
uuid_id!(RatingId);
uuid_id!(RefundRequestId);

pub mod event;
pub mod notification;
pub mod rating;
pub mod refund;
pub mod ticket;
pub mod user;
pub mod venue;

pub use event::{Event, EventPatch, NewEvent};
pub use notification::{InboxEntry, NewNotification, Notification, NotificationPriority};
pub use rating::{NewRating, Rating};
pub use refund::{NewRefundRequest, RefundRequest};
pub use ticket::{NewTicket, Ticket, TicketType};
pub use user::{Actor, Role};
pub use venue::{NewVenue, Venue};
