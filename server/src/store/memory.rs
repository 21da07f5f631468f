//! In-process [`Store`] used by tests and by `STORE_BACKEND=memory`.
//!
//! Each event gets its own async mutex; an [`EventUnit`] holds it for its whole
//! lifetime and stages writes that are applied to the shared tables on commit.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{EventUnit, Store, StoreError, StoreResult};
use crate::models::{
    Event, EventId, EventPatch, InboxEntry, NewEvent, NewNotification, NewRating,
    NewRefundRequest, NewTicket, NewVenue, Notification, NotificationId, Rating, RatingId,
    RefundRequest, RefundRequestId, Ticket, TicketId, TicketType, UserId, Venue, VenueId,
};

#[derive(Debug, Default)]
struct Tables {
    venues: HashMap<VenueId, Venue>,
    events: HashMap<EventId, Event>,
    tickets: BTreeMap<TicketId, Ticket>,
    notifications: Vec<Notification>,
    /// (notification, recipient) -> is_read
    deliveries: HashMap<(NotificationId, UserId), bool>,
    ratings: Vec<Rating>,
    refund_requests: Vec<RefundRequest>,
}

impl Tables {
    fn event_tickets(&self, event: EventId) -> impl Iterator<Item = &Ticket> {
        self.tickets.values().filter(move |t| t.event_id == event)
    }

    fn newest_refund_requests<F>(&self, keep: F) -> Vec<RefundRequest>
    where
        F: Fn(&RefundRequest) -> bool,
    {
        self.refund_requests
            .iter()
            .rev()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

fn lock(tables: &Mutex<Tables>) -> StoreResult<MutexGuard<'_, Tables>> {
    tables.lock().map_err(|_| StoreError::Poisoned)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    event_locks: Mutex<HashMap<EventId, Arc<AsyncMutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self, event: EventId) -> StoreResult<OwnedMutexGuard<()>> {
        let mutex = {
            let mut locks = self.event_locks.lock().map_err(|_| StoreError::Poisoned)?;
            Arc::clone(locks.entry(event).or_default())
        };
        Ok(mutex.lock_owned().await)
    }

    /// Drops the lock entry of an event that no longer exists.
    fn forget(&self, event: EventId) -> StoreResult<()> {
        self.event_locks
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .remove(&event);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_venue(&self, venue: NewVenue) -> StoreResult<Venue> {
        let venue = Venue {
            id: VenueId::new(),
            name: venue.name,
            address: venue.address,
            city: venue.city,
            capacity: venue.capacity,
            contact: venue.contact,
            created_at: Utc::now(),
        };
        lock(&self.tables)?.venues.insert(venue.id, venue.clone());
        Ok(venue)
    }

    async fn venue(&self, id: VenueId) -> StoreResult<Option<Venue>> {
        Ok(lock(&self.tables)?.venues.get(&id).cloned())
    }

    async fn delete_venue(&self, id: VenueId) -> StoreResult<bool> {
        let mut tables = lock(&self.tables)?;
        if tables.events.values().any(|e| e.venue_id == id) {
            return Err(StoreError::VenueInUse(id));
        }
        Ok(tables.venues.remove(&id).is_some())
    }

    async fn insert_event(&self, event: NewEvent, now: DateTime<Utc>) -> StoreResult<Event> {
        let event = Event {
            id: EventId::new(),
            title: event.title,
            description: event.description,
            scheduled_at: event.scheduled_at,
            venue_id: event.venue_id,
            organizer_id: event.organizer_id,
            category_id: event.category_id,
            created_at: now,
            updated_at: now,
        };
        lock(&self.tables)?.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn event(&self, id: EventId) -> StoreResult<Option<Event>> {
        Ok(lock(&self.tables)?.events.get(&id).cloned())
    }

    async fn upcoming_events(&self, now: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = lock(&self.tables)?
            .events
            .values()
            .filter(|e| e.is_future(now))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.scheduled_at);
        Ok(events)
    }

    async fn delete_event(&self, id: EventId) -> StoreResult<bool> {
        let _guard = self.acquire(id).await?;
        {
            let mut tables = lock(&self.tables)?;
            if tables.events.remove(&id).is_none() {
                return Ok(false);
            }
            tables.tickets.retain(|_, t| t.event_id != id);
            tables.ratings.retain(|r| r.event_id != id);
            tables.refund_requests.retain(|r| r.event_id != id);
            for notification in tables.notifications.iter_mut() {
                if notification.event_id == Some(id) {
                    notification.event_id = None;
                }
            }
        }
        self.forget(id)?;
        Ok(true)
    }

    async fn ticket(&self, id: TicketId) -> StoreResult<Option<Ticket>> {
        Ok(lock(&self.tables)?.tickets.get(&id).cloned())
    }

    async fn sold_quantity(&self, event: EventId) -> StoreResult<i32> {
        Ok(lock(&self.tables)?
            .event_tickets(event)
            .map(|t| t.quantity)
            .sum())
    }

    async fn user_quantity(&self, user: UserId, event: EventId) -> StoreResult<i32> {
        Ok(lock(&self.tables)?
            .event_tickets(event)
            .filter(|t| t.user_id == user)
            .map(|t| t.quantity)
            .sum())
    }

    async fn holders(&self, event: EventId) -> StoreResult<BTreeSet<UserId>> {
        Ok(lock(&self.tables)?
            .event_tickets(event)
            .map(|t| t.user_id)
            .collect())
    }

    async fn event_notifications(&self, event: EventId) -> StoreResult<Vec<Notification>> {
        Ok(lock(&self.tables)?
            .notifications
            .iter()
            .filter(|n| n.event_id == Some(event))
            .cloned()
            .collect())
    }

    async fn inbox(&self, user: UserId) -> StoreResult<Vec<InboxEntry>> {
        let tables = lock(&self.tables)?;
        let mut entries: Vec<InboxEntry> = tables
            .notifications
            .iter()
            .filter_map(|n| {
                tables
                    .deliveries
                    .get(&(n.id, user))
                    .map(|is_read| InboxEntry {
                        notification: n.clone(),
                        is_read: *is_read,
                    })
            })
            .collect();
        entries.sort_by(|a, b| b.notification.created_at.cmp(&a.notification.created_at));
        Ok(entries)
    }

    async fn unread_count(&self, user: UserId) -> StoreResult<i64> {
        let tables = lock(&self.tables)?;
        let unread = tables
            .deliveries
            .iter()
            .filter(|((_, recipient), is_read)| *recipient == user && !**is_read)
            .count();
        Ok(unread as i64)
    }

    async fn mark_read(&self, notification: NotificationId, user: UserId) -> StoreResult<bool> {
        let mut tables = lock(&self.tables)?;
        match tables.deliveries.get_mut(&(notification, user)) {
            Some(is_read) => {
                *is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_rating(&self, rating: NewRating) -> StoreResult<Rating> {
        let rating = Rating {
            id: RatingId::new(),
            event_id: rating.event_id,
            user_id: rating.user_id,
            title: rating.title,
            text: rating.text,
            score: rating.score,
            created_at: rating.created_at,
        };
        lock(&self.tables)?.ratings.push(rating.clone());
        Ok(rating)
    }

    async fn event_ratings(&self, event: EventId) -> StoreResult<Vec<Rating>> {
        Ok(lock(&self.tables)?
            .ratings
            .iter()
            .filter(|r| r.event_id == event)
            .cloned()
            .collect())
    }

    async fn refund_request(&self, id: RefundRequestId) -> StoreResult<Option<RefundRequest>> {
        Ok(lock(&self.tables)?
            .refund_requests
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn user_refund_requests(&self, user: UserId) -> StoreResult<Vec<RefundRequest>> {
        Ok(lock(&self.tables)?.newest_refund_requests(|r| r.user_id == user))
    }

    async fn organizer_refund_requests(
        &self,
        organizer: UserId,
    ) -> StoreResult<Vec<RefundRequest>> {
        let tables = lock(&self.tables)?;
        Ok(tables.newest_refund_requests(|r| {
            tables
                .events
                .get(&r.event_id)
                .is_some_and(|e| e.organizer_id == organizer)
        }))
    }

    async fn lock_event(&self, event: EventId) -> StoreResult<Option<Box<dyn EventUnit>>> {
        let guard = self.acquire(event).await?;
        let found = {
            let tables = lock(&self.tables)?;
            match tables.events.get(&event).cloned() {
                Some(event) => {
                    let venue = tables
                        .venues
                        .get(&event.venue_id)
                        .ok_or(StoreError::MissingVenue(event.venue_id))?;
                    Some((venue.capacity, event))
                }
                None => None,
            }
        };
        let Some((capacity, event)) = found else {
            drop(guard);
            self.forget(event)?;
            return Ok(None);
        };

        Ok(Some(Box::new(MemoryUnit {
            tables: Arc::clone(&self.tables),
            _guard: guard,
            event,
            capacity,
            staged: Vec::new(),
        })))
    }
}

#[derive(Debug)]
enum Staged {
    UpsertTicket(Ticket),
    DeleteTicket(TicketId),
    UpdateEvent(Event),
    InsertNotification(Notification, BTreeSet<UserId>),
    UpsertRefundRequest(RefundRequest),
}

struct MemoryUnit {
    tables: Arc<Mutex<Tables>>,
    _guard: OwnedMutexGuard<()>,
    event: Event,
    capacity: i32,
    staged: Vec<Staged>,
}

impl MemoryUnit {
    /// Committed tickets of the event with this unit's staged writes laid over them.
    fn tickets(&self) -> StoreResult<BTreeMap<TicketId, Ticket>> {
        let mut tickets: BTreeMap<TicketId, Ticket> = lock(&self.tables)?
            .event_tickets(self.event.id)
            .map(|t| (t.id, t.clone()))
            .collect();
        for write in &self.staged {
            match write {
                Staged::UpsertTicket(ticket) => {
                    tickets.insert(ticket.id, ticket.clone());
                }
                Staged::DeleteTicket(id) => {
                    tickets.remove(id);
                }
                Staged::UpdateEvent(_)
                | Staged::InsertNotification(..)
                | Staged::UpsertRefundRequest(_) => {}
            }
        }
        Ok(tickets)
    }

    /// Committed refund requests of the event with staged changes laid over them.
    fn refund_requests(&self) -> StoreResult<BTreeMap<RefundRequestId, RefundRequest>> {
        let mut requests: BTreeMap<RefundRequestId, RefundRequest> = lock(&self.tables)?
            .refund_requests
            .iter()
            .filter(|r| r.event_id == self.event.id)
            .map(|r| (r.id, r.clone()))
            .collect();
        for write in &self.staged {
            if let Staged::UpsertRefundRequest(request) = write {
                requests.insert(request.id, request.clone());
            }
        }
        Ok(requests)
    }

    fn sum_excluding<F>(&self, exclude: Option<TicketId>, keep: F) -> StoreResult<i32>
    where
        F: Fn(&Ticket) -> bool,
    {
        Ok(self
            .tickets()?
            .values()
            .filter(|t| Some(t.id) != exclude && keep(t))
            .map(|t| t.quantity)
            .sum())
    }
}

#[async_trait]
impl EventUnit for MemoryUnit {
    fn event(&self) -> &Event {
        &self.event
    }

    fn capacity(&self) -> i32 {
        self.capacity
    }

    async fn ticket(&mut self, id: TicketId) -> StoreResult<Option<Ticket>> {
        Ok(self.tickets()?.remove(&id))
    }

    async fn sold_quantity(&mut self, exclude: Option<TicketId>) -> StoreResult<i32> {
        self.sum_excluding(exclude, |_| true)
    }

    async fn user_quantity(
        &mut self,
        user: UserId,
        exclude: Option<TicketId>,
    ) -> StoreResult<i32> {
        self.sum_excluding(exclude, |t| t.user_id == user)
    }

    async fn holders(&mut self) -> StoreResult<BTreeSet<UserId>> {
        Ok(self.tickets()?.values().map(|t| t.user_id).collect())
    }

    async fn ticket_code_taken(&mut self, code: &str) -> StoreResult<bool> {
        if self.tickets()?.values().any(|t| t.ticket_code == code) {
            return Ok(true);
        }
        Ok(lock(&self.tables)?
            .tickets
            .values()
            .any(|t| t.ticket_code == code))
    }

    async fn ticket_by_code(&mut self, code: &str) -> StoreResult<Option<Ticket>> {
        Ok(self
            .tickets()?
            .into_values()
            .find(|t| t.ticket_code == code))
    }

    async fn insert_ticket(&mut self, ticket: NewTicket) -> StoreResult<Ticket> {
        let ticket = Ticket {
            id: TicketId::new(),
            event_id: self.event.id,
            user_id: ticket.user_id,
            quantity: ticket.quantity,
            ticket_type: ticket.ticket_type,
            ticket_code: ticket.ticket_code,
            buy_date: ticket.buy_date,
        };
        self.staged.push(Staged::UpsertTicket(ticket.clone()));
        Ok(ticket)
    }

    async fn update_ticket(
        &mut self,
        id: TicketId,
        quantity: i32,
        ticket_type: TicketType,
    ) -> StoreResult<Ticket> {
        let mut ticket = self
            .tickets()?
            .remove(&id)
            .ok_or(StoreError::TicketNotInEvent(id))?;
        ticket.quantity = quantity;
        ticket.ticket_type = ticket_type;
        self.staged.push(Staged::UpsertTicket(ticket.clone()));
        Ok(ticket)
    }

    async fn delete_ticket(&mut self, id: TicketId) -> StoreResult<()> {
        if !self.tickets()?.contains_key(&id) {
            return Err(StoreError::TicketNotInEvent(id));
        }
        self.staged.push(Staged::DeleteTicket(id));
        Ok(())
    }

    async fn update_event(&mut self, patch: &EventPatch, now: DateTime<Utc>) -> StoreResult<Event> {
        let event = patch.apply(&self.event, now);
        self.event = event.clone();
        self.staged.push(Staged::UpdateEvent(event.clone()));
        Ok(event)
    }

    async fn notification_exists(&mut self, title: &str, message: &str) -> StoreResult<bool> {
        let staged = self.staged.iter().any(|write| {
            matches!(write, Staged::InsertNotification(n, _) if n.title == title && n.message == message)
        });
        if staged {
            return Ok(true);
        }
        Ok(lock(&self.tables)?.notifications.iter().any(|n| {
            n.event_id == Some(self.event.id) && n.title == title && n.message == message
        }))
    }

    async fn insert_notification(
        &mut self,
        notification: NewNotification,
        recipients: &BTreeSet<UserId>,
    ) -> StoreResult<Notification> {
        let notification = Notification {
            id: NotificationId::new(),
            event_id: Some(self.event.id),
            title: notification.title,
            message: notification.message,
            priority: notification.priority,
            created_at: notification.created_at,
        };
        self.staged.push(Staged::InsertNotification(
            notification.clone(),
            recipients.clone(),
        ));
        Ok(notification)
    }

    async fn refund_request(&mut self, id: RefundRequestId) -> StoreResult<Option<RefundRequest>> {
        Ok(self.refund_requests()?.remove(&id))
    }

    async fn refund_pending(&mut self, ticket_code: &str) -> StoreResult<bool> {
        Ok(self
            .refund_requests()?
            .values()
            .any(|r| r.ticket_code == ticket_code && r.is_pending()))
    }

    async fn insert_refund_request(
        &mut self,
        request: NewRefundRequest,
    ) -> StoreResult<RefundRequest> {
        let request = RefundRequest {
            id: RefundRequestId::new(),
            event_id: self.event.id,
            user_id: request.user_id,
            ticket_code: request.ticket_code,
            reason: request.reason,
            approved: None,
            decided_at: None,
            created_at: request.created_at,
        };
        self.staged.push(Staged::UpsertRefundRequest(request.clone()));
        Ok(request)
    }

    async fn decide_refund_request(
        &mut self,
        id: RefundRequestId,
        approved: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<RefundRequest> {
        let mut request = self
            .refund_requests()?
            .remove(&id)
            .ok_or(StoreError::RefundRequestNotInEvent(id))?;
        request.approved = Some(approved);
        request.decided_at = Some(now);
        self.staged.push(Staged::UpsertRefundRequest(request.clone()));
        Ok(request)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        // The event lock is released only after the writes are visible.
        let MemoryUnit {
            tables,
            _guard,
            staged,
            ..
        } = *self;
        let mut tables = lock(&tables)?;
        // Same check the venue foreign key makes in Postgres; `delete_venue`
        // inspects events under this mutex, so one of the two must fail.
        for write in &staged {
            if let Staged::UpdateEvent(event) = write {
                if !tables.venues.contains_key(&event.venue_id) {
                    return Err(StoreError::MissingVenue(event.venue_id));
                }
            }
        }
        for write in staged {
            match write {
                Staged::UpsertTicket(ticket) => {
                    tables.tickets.insert(ticket.id, ticket);
                }
                Staged::DeleteTicket(id) => {
                    tables.tickets.remove(&id);
                }
                Staged::UpdateEvent(event) => {
                    tables.events.insert(event.id, event);
                }
                Staged::InsertNotification(notification, recipients) => {
                    for user in recipients {
                        tables.deliveries.insert((notification.id, user), false);
                    }
                    tables.notifications.push(notification);
                }
                Staged::UpsertRefundRequest(request) => {
                    match tables.refund_requests.iter_mut().find(|r| r.id == request.id) {
                        Some(existing) => *existing = request,
                        None => tables.refund_requests.push(request),
                    }
                }
            }
        }
        Ok(())
    }
}
