//! Ticket inventory service, the only writer of ticket rows.
//!
//! The free functions run inside an [`EventUnit`] and assume the caller has
//! already decided who is allowed to act; the [`Ticketing`] methods below
//! resolve ids, authorize the actor, take the lock and commit.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::quota::LimitCheck;
use super::{capacity, quota, InputError, Ticketing, TicketingError};
use crate::models::{
    Actor, Event, EventId, NewTicket, Ticket, TicketId, TicketType, UserId,
};
use crate::store::{EventUnit, StoreResult};

const TICKET_CODE_LEN: usize = 8;
const TICKET_CODE_ATTEMPTS: usize = 5;

pub fn validate_request(quantity: i32, ticket_type: &str) -> Result<TicketType, InputError> {
    if quantity <= 0 {
        return Err(InputError::NonPositiveQuantity(quantity));
    }
    ticket_type
        .parse()
        .map_err(|_| InputError::UnknownTicketType(ticket_type.to_string()))
}

fn new_ticket_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(TICKET_CODE_LEN);
    code.make_ascii_uppercase();
    code
}

async fn issue_ticket_code(unit: &mut dyn EventUnit) -> StoreResult<String> {
    for _ in 0..TICKET_CODE_ATTEMPTS {
        let code = new_ticket_code();
        if !unit.ticket_code_taken(&code).await? {
            return Ok(code);
        }
    }
    Ok(Uuid::new_v4().simple().to_string().to_ascii_uppercase())
}

pub async fn purchase(
    unit: &mut dyn EventUnit,
    buyer: UserId,
    quantity: i32,
    ticket_type: &str,
    now: DateTime<Utc>,
) -> Result<Ticket, TicketingError> {
    if unit.event().has_occurred(now) {
        return Err(TicketingError::EventAlreadyOccurred);
    }
    if unit.event().organizer_id == buyer {
        return Err(TicketingError::OrganizerCannotPurchase);
    }
    let ticket_type = validate_request(quantity, ticket_type)?;

    quota::check_quota(unit, buyer, quantity, None).await?;
    capacity::reserve(unit, quantity, None).await?;

    let ticket_code = issue_ticket_code(unit).await?;
    let ticket = unit
        .insert_ticket(NewTicket {
            user_id: buyer,
            quantity,
            ticket_type,
            ticket_code,
            buy_date: now,
        })
        .await?;
    Ok(ticket)
}

/// Re-checks quota and capacity with the ticket's own quantity left out.
pub async fn edit(
    unit: &mut dyn EventUnit,
    ticket: &Ticket,
    new_quantity: i32,
    new_type: &str,
    now: DateTime<Utc>,
) -> Result<Ticket, TicketingError> {
    if unit.event().has_occurred(now) {
        return Err(TicketingError::EventAlreadyOccurred);
    }
    let ticket_type = validate_request(new_quantity, new_type)?;

    quota::check_quota(unit, ticket.user_id, new_quantity, Some(ticket.id)).await?;
    capacity::reserve(unit, new_quantity, Some(ticket.id)).await?;

    Ok(unit
        .update_ticket(ticket.id, new_quantity, ticket_type)
        .await?)
}

/// Deletes the ticket, returning its seats and quota to the pool.
pub async fn refund(
    unit: &mut dyn EventUnit,
    ticket: &Ticket,
    now: DateTime<Utc>,
) -> Result<(), TicketingError> {
    if unit.event().has_occurred(now) {
        return Err(TicketingError::EventAlreadyOccurred);
    }
    unit.delete_ticket(ticket.id).await?;
    Ok(())
}

pub async fn holders(unit: &mut dyn EventUnit) -> StoreResult<BTreeSet<UserId>> {
    unit.holders().await
}

fn authorize_ticket_change(
    actor: &Actor,
    ticket: &Ticket,
    event: &Event,
) -> Result<(), TicketingError> {
    if ticket.user_id == actor.user_id || event.organizer_id == actor.user_id {
        Ok(())
    } else {
        Err(TicketingError::Forbidden(
            "only the ticket owner or the event organizer can change a ticket",
        ))
    }
}

impl Ticketing {
    pub async fn purchase(
        &self,
        actor: &Actor,
        event_id: EventId,
        quantity: i32,
        ticket_type: &str,
    ) -> Result<Ticket, TicketingError> {
        let mut unit = self.lock_event(event_id).await?;
        let ticket = purchase(
            unit.as_mut(),
            actor.user_id,
            quantity,
            ticket_type,
            self.clock.now(),
        )
        .await?;
        unit.commit().await?;
        Ok(ticket)
    }

    pub async fn edit_ticket(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
        new_quantity: i32,
        new_type: &str,
    ) -> Result<Ticket, TicketingError> {
        let (mut unit, ticket) = self.lock_ticket(ticket_id).await?;
        authorize_ticket_change(actor, &ticket, unit.event())?;
        let updated = edit(
            unit.as_mut(),
            &ticket,
            new_quantity,
            new_type,
            self.clock.now(),
        )
        .await?;
        unit.commit().await?;
        Ok(updated)
    }

    /// Organizer-side cancellation. Holders ask through a refund request instead.
    pub async fn refund_ticket(
        &self,
        actor: &Actor,
        ticket_id: TicketId,
    ) -> Result<Ticket, TicketingError> {
        let (mut unit, ticket) = self.lock_ticket(ticket_id).await?;
        if unit.event().organizer_id != actor.user_id {
            return Err(TicketingError::Forbidden(
                "only the event organizer can refund a ticket directly",
            ));
        }
        refund(unit.as_mut(), &ticket, self.clock.now()).await?;
        unit.commit().await?;
        Ok(ticket)
    }

    /// Advisory preview; the authoritative check happens again on purchase.
    pub async fn check_limit(
        &self,
        actor: &Actor,
        event_id: EventId,
        proposed: i32,
    ) -> Result<LimitCheck, TicketingError> {
        if proposed <= 0 {
            return Err(InputError::NonPositiveQuantity(proposed).into());
        }
        self.event(event_id).await?;
        let current = self.store.user_quantity(actor.user_id, event_id).await?;
        Ok(LimitCheck::preview(current, proposed))
    }

    pub async fn holders(&self, event_id: EventId) -> Result<BTreeSet<UserId>, TicketingError> {
        self.event(event_id).await?;
        Ok(self.store.holders(event_id).await?)
    }

    /// Advisory seat count for display.
    pub async fn available_seats(&self, event: &Event) -> Result<i32, TicketingError> {
        let venue = self
            .store
            .venue(event.venue_id)
            .await?
            .ok_or(TicketingError::NotFound("venue"))?;
        let sold = self.store.sold_quantity(event.id).await?;
        Ok(capacity::remaining(venue.capacity, sold).max(0))
    }

    async fn lock_ticket(
        &self,
        ticket_id: TicketId,
    ) -> Result<(Box<dyn EventUnit>, Ticket), TicketingError> {
        let ticket = self
            .store
            .ticket(ticket_id)
            .await?
            .ok_or(TicketingError::NotFound("ticket"))?;
        let mut unit = self.lock_event(ticket.event_id).await?;
        // The ticket may have been refunded while we waited for the lock.
        let ticket = unit
            .ticket(ticket_id)
            .await?
            .ok_or(TicketingError::NotFound("ticket"))?;
        Ok((unit, ticket))
    }
}
