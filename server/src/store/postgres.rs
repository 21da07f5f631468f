//! Postgres-backed [`Store`].
//!
//! An [`EventUnit`] is a transaction that starts by taking `FOR UPDATE` on the
//! event row. Purchases, ticket edits, refunds and reschedules of the same
//! event therefore queue behind each other until the holder commits or rolls
//! back, which keeps the capacity and per-user totals exact.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::{EventUnit, Store, StoreError, StoreResult};
use crate::models::{
    Event, EventId, EventPatch, InboxEntry, NewEvent, NewNotification, NewRating,
    NewRefundRequest, NewTicket, NewVenue, Notification, NotificationId, Rating, RatingId,
    RefundRequest, RefundRequestId, Ticket, TicketId, TicketType, UserId, Venue, VenueId,
};

const EVENT_COLUMNS: &str = "id, title, description, scheduled_at, venue_id, organizer_id, \
                             category_id, created_at, updated_at";
const TICKET_COLUMNS: &str =
    "id, event_id, user_id, quantity, ticket_type, ticket_code, buy_date";
const NOTIFICATION_COLUMNS: &str = "id, event_id, title, message, priority, created_at";
const RATING_COLUMNS: &str = "id, event_id, user_id, title, text, score, created_at";
const REFUND_COLUMNS: &str =
    "id, event_id, user_id, ticket_code, reason, approved, decided_at, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct LockedEvent {
    #[sqlx(flatten)]
    event: Event,
    capacity: Option<i32>,
}

#[async_trait]
impl Store for PgStore {
    async fn insert_venue(&self, venue: NewVenue) -> StoreResult<Venue> {
        let venue = sqlx::query_as::<_, Venue>(
            "INSERT INTO venues (id, name, address, city, capacity, contact) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, name, address, city, capacity, contact, created_at",
        )
        .bind(VenueId::new())
        .bind(venue.name)
        .bind(venue.address)
        .bind(venue.city)
        .bind(venue.capacity)
        .bind(venue.contact)
        .fetch_one(&self.pool)
        .await?;
        Ok(venue)
    }

    async fn venue(&self, id: VenueId) -> StoreResult<Option<Venue>> {
        let venue = sqlx::query_as::<_, Venue>(
            "SELECT id, name, address, city, capacity, contact, created_at \
             FROM venues WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(venue)
    }

    async fn delete_venue(&self, id: VenueId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM venues WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(StoreError::VenueInUse(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_event(&self, event: NewEvent, now: DateTime<Utc>) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events \
             (id, title, description, scheduled_at, venue_id, organizer_id, category_id, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(EventId::new())
        .bind(event.title)
        .bind(event.description)
        .bind(event.scheduled_at)
        .bind(event.venue_id)
        .bind(event.organizer_id)
        .bind(event.category_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn event(&self, id: EventId) -> StoreResult<Option<Event>> {
        let event =
            sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(event)
    }

    async fn upcoming_events(&self, now: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE scheduled_at > $1 ORDER BY scheduled_at"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn delete_event(&self, id: EventId) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn ticket(&self, id: TicketId) -> StoreResult<Option<Ticket>> {
        let ticket =
            sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(ticket)
    }

    async fn sold_quantity(&self, event: EventId) -> StoreResult<i32> {
        let sold: i32 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::int4 FROM tickets WHERE event_id = $1",
        )
        .bind(event)
        .fetch_one(&self.pool)
        .await?;
        Ok(sold)
    }

    async fn user_quantity(&self, user: UserId, event: EventId) -> StoreResult<i32> {
        let held: i32 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::int4 FROM tickets \
             WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event)
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(held)
    }

    async fn holders(&self, event: EventId) -> StoreResult<BTreeSet<UserId>> {
        let users: Vec<UserId> =
            sqlx::query_scalar("SELECT DISTINCT user_id FROM tickets WHERE event_id = $1")
                .bind(event)
                .fetch_all(&self.pool)
                .await?;
        Ok(users.into_iter().collect())
    }

    async fn event_notifications(&self, event: EventId) -> StoreResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE event_id = $1 ORDER BY created_at DESC"
        ))
        .bind(event)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn inbox(&self, user: UserId) -> StoreResult<Vec<InboxEntry>> {
        let entries = sqlx::query_as::<_, InboxEntry>(
            "SELECT n.id, n.event_id, n.title, n.message, n.priority, n.created_at, r.is_read \
             FROM notifications n \
             JOIN notification_recipients r ON r.notification_id = n.id \
             WHERE r.user_id = $1 \
             ORDER BY n.created_at DESC",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn unread_count(&self, user: UserId) -> StoreResult<i64> {
        let unread: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification_recipients WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(unread)
    }

    async fn mark_read(&self, notification: NotificationId, user: UserId) -> StoreResult<bool> {
        let done = sqlx::query(
            "UPDATE notification_recipients SET is_read = TRUE \
             WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(notification)
        .bind(user)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn insert_rating(&self, rating: NewRating) -> StoreResult<Rating> {
        let rating = sqlx::query_as::<_, Rating>(&format!(
            "INSERT INTO ratings (id, event_id, user_id, title, text, score, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {RATING_COLUMNS}"
        ))
        .bind(RatingId::new())
        .bind(rating.event_id)
        .bind(rating.user_id)
        .bind(rating.title)
        .bind(rating.text)
        .bind(rating.score)
        .bind(rating.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn event_ratings(&self, event: EventId) -> StoreResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE event_id = $1 ORDER BY created_at"
        ))
        .bind(event)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn refund_request(&self, id: RefundRequestId) -> StoreResult<Option<RefundRequest>> {
        let request = sqlx::query_as::<_, RefundRequest>(&format!(
            "SELECT {REFUND_COLUMNS} FROM refund_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn user_refund_requests(&self, user: UserId) -> StoreResult<Vec<RefundRequest>> {
        let requests = sqlx::query_as::<_, RefundRequest>(&format!(
            "SELECT {REFUND_COLUMNS} FROM refund_requests \
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn organizer_refund_requests(
        &self,
        organizer: UserId,
    ) -> StoreResult<Vec<RefundRequest>> {
        let requests = sqlx::query_as::<_, RefundRequest>(
            "SELECT r.id, r.event_id, r.user_id, r.ticket_code, r.reason, r.approved, \
                    r.decided_at, r.created_at \
             FROM refund_requests r JOIN events e ON e.id = r.event_id \
             WHERE e.organizer_id = $1 \
             ORDER BY r.created_at DESC",
        )
        .bind(organizer)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn lock_event(&self, event: EventId) -> StoreResult<Option<Box<dyn EventUnit>>> {
        let mut tx = self.pool.begin().await?;
        let locked = sqlx::query_as::<_, LockedEvent>(
            "SELECT e.id, e.title, e.description, e.scheduled_at, e.venue_id, e.organizer_id, \
                    e.category_id, e.created_at, e.updated_at, v.capacity \
             FROM events e LEFT JOIN venues v ON v.id = e.venue_id \
             WHERE e.id = $1 \
             FOR UPDATE OF e",
        )
        .bind(event)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(locked) = locked else {
            return Ok(None);
        };
        let capacity = locked
            .capacity
            .ok_or(StoreError::MissingVenue(locked.event.venue_id))?;
        Ok(Some(Box::new(PgEventUnit {
            tx,
            event: locked.event,
            capacity,
        })))
    }
}

struct PgEventUnit {
    tx: Transaction<'static, Postgres>,
    event: Event,
    capacity: i32,
}

#[async_trait]
impl EventUnit for PgEventUnit {
    fn event(&self) -> &Event {
        &self.event
    }

    fn capacity(&self) -> i32 {
        self.capacity
    }

    async fn ticket(&mut self, id: TicketId) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 AND event_id = $2"
        ))
        .bind(id)
        .bind(self.event.id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(ticket)
    }

    async fn sold_quantity(&mut self, exclude: Option<TicketId>) -> StoreResult<i32> {
        let sold: i32 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::int4 FROM tickets \
             WHERE event_id = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(self.event.id)
        .bind(exclude)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(sold)
    }

    async fn user_quantity(
        &mut self,
        user: UserId,
        exclude: Option<TicketId>,
    ) -> StoreResult<i32> {
        let held: i32 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::int4 FROM tickets \
             WHERE event_id = $1 AND user_id = $2 AND ($3::uuid IS NULL OR id <> $3)",
        )
        .bind(self.event.id)
        .bind(user)
        .bind(exclude)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(held)
    }

    async fn holders(&mut self) -> StoreResult<BTreeSet<UserId>> {
        let users: Vec<UserId> =
            sqlx::query_scalar("SELECT DISTINCT user_id FROM tickets WHERE event_id = $1")
                .bind(self.event.id)
                .fetch_all(&mut *self.tx)
                .await?;
        Ok(users.into_iter().collect())
    }

    async fn ticket_code_taken(&mut self, code: &str) -> StoreResult<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tickets WHERE ticket_code = $1)")
                .bind(code)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(taken)
    }

    async fn ticket_by_code(&mut self, code: &str) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_code = $1 AND event_id = $2"
        ))
        .bind(code)
        .bind(self.event.id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(ticket)
    }

    async fn insert_ticket(&mut self, ticket: NewTicket) -> StoreResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "INSERT INTO tickets \
             (id, event_id, user_id, quantity, ticket_type, ticket_code, buy_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(TicketId::new())
        .bind(self.event.id)
        .bind(ticket.user_id)
        .bind(ticket.quantity)
        .bind(ticket.ticket_type)
        .bind(ticket.ticket_code)
        .bind(ticket.buy_date)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(ticket)
    }

    async fn update_ticket(
        &mut self,
        id: TicketId,
        quantity: i32,
        ticket_type: TicketType,
    ) -> StoreResult<Ticket> {
        sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE tickets SET quantity = $3, ticket_type = $4 \
             WHERE id = $1 AND event_id = $2 \
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(id)
        .bind(self.event.id)
        .bind(quantity)
        .bind(ticket_type)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::TicketNotInEvent(id))
    }

    async fn delete_ticket(&mut self, id: TicketId) -> StoreResult<()> {
        let done = sqlx::query("DELETE FROM tickets WHERE id = $1 AND event_id = $2")
            .bind(id)
            .bind(self.event.id)
            .execute(&mut *self.tx)
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::TicketNotInEvent(id));
        }
        Ok(())
    }

    async fn update_event(&mut self, patch: &EventPatch, now: DateTime<Utc>) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 category_id = COALESCE($4, category_id), \
                 scheduled_at = $5, \
                 venue_id = $6, \
                 updated_at = $7 \
             WHERE id = $1 \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(self.event.id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.category_id)
        .bind(patch.scheduled_at)
        .bind(patch.venue_id)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::MissingVenue(patch.venue_id)
            }
            e => e.into(),
        })?;
        self.event = event.clone();
        Ok(event)
    }

    async fn notification_exists(&mut self, title: &str, message: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM notifications \
             WHERE event_id = $1 AND title = $2 AND message = $3)",
        )
        .bind(self.event.id)
        .bind(title)
        .bind(message)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert_notification(
        &mut self,
        notification: NewNotification,
        recipients: &BTreeSet<UserId>,
    ) -> StoreResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (id, event_id, title, message, priority, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(NotificationId::new())
        .bind(self.event.id)
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.priority)
        .bind(notification.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        let users: Vec<Uuid> = recipients.iter().map(|user| user.0).collect();
        sqlx::query(
            "INSERT INTO notification_recipients (notification_id, user_id) \
             SELECT $1, recipient FROM UNNEST($2::uuid[]) AS recipient",
        )
        .bind(notification.id)
        .bind(users)
        .execute(&mut *self.tx)
        .await?;

        Ok(notification)
    }

    async fn refund_request(&mut self, id: RefundRequestId) -> StoreResult<Option<RefundRequest>> {
        let request = sqlx::query_as::<_, RefundRequest>(&format!(
            "SELECT {REFUND_COLUMNS} FROM refund_requests WHERE id = $1 AND event_id = $2"
        ))
        .bind(id)
        .bind(self.event.id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(request)
    }

    async fn refund_pending(&mut self, ticket_code: &str) -> StoreResult<bool> {
        let pending: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM refund_requests \
             WHERE event_id = $1 AND ticket_code = $2 AND approved IS NULL)",
        )
        .bind(self.event.id)
        .bind(ticket_code)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(pending)
    }

    async fn insert_refund_request(
        &mut self,
        request: NewRefundRequest,
    ) -> StoreResult<RefundRequest> {
        let request = sqlx::query_as::<_, RefundRequest>(&format!(
            "INSERT INTO refund_requests \
             (id, event_id, user_id, ticket_code, reason, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {REFUND_COLUMNS}"
        ))
        .bind(RefundRequestId::new())
        .bind(self.event.id)
        .bind(request.user_id)
        .bind(request.ticket_code)
        .bind(request.reason)
        .bind(request.created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(request)
    }

    async fn decide_refund_request(
        &mut self,
        id: RefundRequestId,
        approved: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<RefundRequest> {
        sqlx::query_as::<_, RefundRequest>(&format!(
            "UPDATE refund_requests SET approved = $3, decided_at = $4 \
             WHERE id = $1 AND event_id = $2 \
             RETURNING {REFUND_COLUMNS}"
        ))
        .bind(id)
        .bind(self.event.id)
        .bind(approved)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(StoreError::RefundRequestNotInEvent(id))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
