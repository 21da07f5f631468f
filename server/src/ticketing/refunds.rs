//! Refund requests: a holder asks, the organizer decides.
//!
//! Approval deletes the ticket inside the same event unit that records the
//! decision, so seats and quota come back atomically with it.

use super::{inventory, non_empty, Ticketing, TicketingError};
use crate::models::{Actor, EventId, NewRefundRequest, RefundRequest, RefundRequestId};

#[derive(Debug, Clone)]
pub struct RefundDraft {
    pub ticket_code: String,
    pub reason: String,
}

impl Ticketing {
    pub async fn request_refund(
        &self,
        actor: &Actor,
        event_id: EventId,
        draft: RefundDraft,
    ) -> Result<RefundRequest, TicketingError> {
        let ticket_code = non_empty("ticket_code", draft.ticket_code.trim().to_ascii_uppercase())?;
        let reason = non_empty("reason", draft.reason)?;
        let now = self.clock.now();

        let mut unit = self.lock_event(event_id).await?;
        if unit.event().has_occurred(now) {
            return Err(TicketingError::EventAlreadyOccurred);
        }
        let ticket = unit
            .ticket_by_code(&ticket_code)
            .await?
            .filter(|t| t.user_id == actor.user_id)
            .ok_or(TicketingError::NotFound("ticket"))?;
        if unit.refund_pending(&ticket.ticket_code).await? {
            return Err(TicketingError::RefundAlreadyRequested);
        }
        let request = unit
            .insert_refund_request(NewRefundRequest {
                user_id: actor.user_id,
                ticket_code: ticket.ticket_code,
                reason,
                created_at: now,
            })
            .await?;
        unit.commit().await?;
        Ok(request)
    }

    /// Approving deletes the ticket; rejecting leaves it untouched.
    pub async fn decide_refund(
        &self,
        actor: &Actor,
        request_id: RefundRequestId,
        approve: bool,
    ) -> Result<RefundRequest, TicketingError> {
        let request = self
            .store
            .refund_request(request_id)
            .await?
            .ok_or(TicketingError::NotFound("refund request"))?;
        let now = self.clock.now();

        let mut unit = self.lock_event(request.event_id).await?;
        if unit.event().organizer_id != actor.user_id {
            return Err(TicketingError::Forbidden(
                "only the event organizer can decide refund requests",
            ));
        }
        let request = unit
            .refund_request(request_id)
            .await?
            .ok_or(TicketingError::NotFound("refund request"))?;
        if !request.is_pending() {
            return Err(TicketingError::RefundAlreadyDecided);
        }
        if approve {
            let ticket = unit
                .ticket_by_code(&request.ticket_code)
                .await?
                .ok_or(TicketingError::NotFound("ticket"))?;
            inventory::refund(unit.as_mut(), &ticket, now).await?;
        }
        let decided = unit.decide_refund_request(request_id, approve, now).await?;
        unit.commit().await?;
        Ok(decided)
    }

    pub async fn my_refund_requests(
        &self,
        actor: &Actor,
    ) -> Result<Vec<RefundRequest>, TicketingError> {
        Ok(self.store.user_refund_requests(actor.user_id).await?)
    }

    /// Requests on every event the actor organizes.
    pub async fn organizer_refund_requests(
        &self,
        actor: &Actor,
    ) -> Result<Vec<RefundRequest>, TicketingError> {
        Ok(self.store.organizer_refund_requests(actor.user_id).await?)
    }
}
