use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;

use super::extract::{AppJson, AppPath, AppQuery};
use super::AppState;
use crate::models::{Actor, EventId, TicketId};
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

/// Ticket type stays a string so unknown values reach the core as `InvalidInput`.
#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    pub quantity: i32,
    pub ticket_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(alias = "cantidad")]
    pub quantity: i32,
}

pub async fn purchase(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
    AppJson(body): AppJson<TicketRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .ticketing
        .purchase(&actor, event_id, body.quantity, &body.ticket_type)
        .await?;
    tracing::info!(
        ticket_id = %ticket.id,
        %event_id,
        user_id = %actor.user_id,
        quantity = ticket.quantity,
        "Ticket purchased"
    );
    Ok(created(ticket, "Ticket purchased"))
}

pub async fn check_limit(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
    AppQuery(query): AppQuery<LimitQuery>,
) -> Result<Response, AppError> {
    let check = state
        .ticketing
        .check_limit(&actor, event_id, query.quantity)
        .await?;
    Ok(success(check, "Ticket limit checked"))
}

pub async fn edit_ticket(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(ticket_id): AppPath<TicketId>,
    AppJson(body): AppJson<TicketRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .ticketing
        .edit_ticket(&actor, ticket_id, body.quantity, &body.ticket_type)
        .await?;
    tracing::info!(%ticket_id, quantity = ticket.quantity, "Ticket updated");
    Ok(success(ticket, "Ticket updated"))
}

pub async fn refund_ticket(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(ticket_id): AppPath<TicketId>,
) -> Result<Response, AppError> {
    let ticket = state.ticketing.refund_ticket(&actor, ticket_id).await?;
    tracing::info!(%ticket_id, event_id = %ticket.event_id, "Ticket refunded");
    Ok(success(ticket, "Ticket refunded"))
}
