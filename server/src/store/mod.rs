//! Persistence seam for the ticketing core.
//!
//! Every write that touches the sold-seat or per-user aggregates of an event
//! goes through an [`EventUnit`], which holds an exclusive lock on that event
//! until it is committed or dropped. Dropping a unit without calling
//! [`EventUnit::commit`] discards all of its writes.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Event, EventId, EventPatch, InboxEntry, NewEvent, NewNotification, NewRating,
    NewRefundRequest, NewTicket, NewVenue, Notification, NotificationId, Rating, RefundRequest,
    RefundRequestId, Ticket, TicketId, TicketType, UserId, Venue, VenueId,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("venue {0} is still referenced by events")]
    VenueInUse(VenueId),

    #[error("ticket {0} does not belong to the locked event")]
    TicketNotInEvent(TicketId),

    #[error("venue {0} does not exist")]
    MissingVenue(VenueId),

    #[error("refund request {0} does not belong to the locked event")]
    RefundRequestNotInEvent(RefundRequestId),

    #[error("in-memory store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_venue(&self, venue: NewVenue) -> StoreResult<Venue>;

    async fn venue(&self, id: VenueId) -> StoreResult<Option<Venue>>;

    /// Fails with [`StoreError::VenueInUse`] while any event references the venue.
    async fn delete_venue(&self, id: VenueId) -> StoreResult<bool>;

    async fn insert_event(&self, event: NewEvent, now: DateTime<Utc>) -> StoreResult<Event>;

    async fn event(&self, id: EventId) -> StoreResult<Option<Event>>;

    /// Events scheduled strictly after `now`, soonest first.
    async fn upcoming_events(&self, now: DateTime<Utc>) -> StoreResult<Vec<Event>>;

    /// Deletes the event together with its tickets.
    async fn delete_event(&self, id: EventId) -> StoreResult<bool>;

    async fn ticket(&self, id: TicketId) -> StoreResult<Option<Ticket>>;

    /// Unlocked read of the seats sold for an event. Advisory only.
    async fn sold_quantity(&self, event: EventId) -> StoreResult<i32>;

    /// Unlocked read of a user's tickets for an event. Advisory only.
    async fn user_quantity(&self, user: UserId, event: EventId) -> StoreResult<i32>;

    async fn holders(&self, event: EventId) -> StoreResult<BTreeSet<UserId>>;

    async fn event_notifications(&self, event: EventId) -> StoreResult<Vec<Notification>>;

    /// Newest first.
    async fn inbox(&self, user: UserId) -> StoreResult<Vec<InboxEntry>>;

    async fn unread_count(&self, user: UserId) -> StoreResult<i64>;

    /// Returns false when `user` is not a recipient of the notification.
    async fn mark_read(&self, notification: NotificationId, user: UserId) -> StoreResult<bool>;

    async fn insert_rating(&self, rating: NewRating) -> StoreResult<Rating>;

    /// Oldest first.
    async fn event_ratings(&self, event: EventId) -> StoreResult<Vec<Rating>>;

    async fn refund_request(&self, id: RefundRequestId) -> StoreResult<Option<RefundRequest>>;

    /// Requests filed by `user`, newest first.
    async fn user_refund_requests(&self, user: UserId) -> StoreResult<Vec<RefundRequest>>;

    /// Requests on events organized by `organizer`, newest first.
    async fn organizer_refund_requests(&self, organizer: UserId)
        -> StoreResult<Vec<RefundRequest>>;

    /// Opens an exclusive unit of work on `event`. `None` when the event does not exist.
    async fn lock_event(&self, event: EventId) -> StoreResult<Option<Box<dyn EventUnit>>>;
}

/// Serialized view of one event and everything hanging off it.
///
/// Reads observe the unit's own uncommitted writes.
#[async_trait]
pub trait EventUnit: Send {
    /// The event as read under the lock, including writes made through this unit.
    fn event(&self) -> &Event;

    /// Capacity of the venue the event was at when the lock was taken.
    fn capacity(&self) -> i32;

    async fn ticket(&mut self, id: TicketId) -> StoreResult<Option<Ticket>>;

    async fn sold_quantity(&mut self, exclude: Option<TicketId>) -> StoreResult<i32>;

    async fn user_quantity(&mut self, user: UserId, exclude: Option<TicketId>)
        -> StoreResult<i32>;

    async fn holders(&mut self) -> StoreResult<BTreeSet<UserId>>;

    async fn ticket_code_taken(&mut self, code: &str) -> StoreResult<bool>;

    async fn ticket_by_code(&mut self, code: &str) -> StoreResult<Option<Ticket>>;

    async fn insert_ticket(&mut self, ticket: NewTicket) -> StoreResult<Ticket>;

    async fn update_ticket(
        &mut self,
        id: TicketId,
        quantity: i32,
        ticket_type: TicketType,
    ) -> StoreResult<Ticket>;

    async fn delete_ticket(&mut self, id: TicketId) -> StoreResult<()>;

    async fn update_event(&mut self, patch: &EventPatch, now: DateTime<Utc>) -> StoreResult<Event>;

    async fn notification_exists(&mut self, title: &str, message: &str) -> StoreResult<bool>;

    /// Creates the notification and links every recipient in one step.
    async fn insert_notification(
        &mut self,
        notification: NewNotification,
        recipients: &BTreeSet<UserId>,
    ) -> StoreResult<Notification>;

    async fn refund_request(&mut self, id: RefundRequestId) -> StoreResult<Option<RefundRequest>>;

    /// True when an undecided request for `ticket_code` already exists.
    async fn refund_pending(&mut self, ticket_code: &str) -> StoreResult<bool>;

    async fn insert_refund_request(
        &mut self,
        request: NewRefundRequest,
    ) -> StoreResult<RefundRequest>;

    async fn decide_refund_request(
        &mut self,
        id: RefundRequestId,
        approved: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<RefundRequest>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
