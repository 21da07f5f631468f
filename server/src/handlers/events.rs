use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::extract::{AppJson, AppPath};
use super::AppState;
use crate::models::{Actor, CategoryId, EventId, EventPatch, VenueId};
use crate::ticketing::EventDraft;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub venue_id: VenueId,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Deserialize)]
pub struct EditEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub scheduled_at: DateTime<Utc>,
    pub venue_id: VenueId,
}

pub async fn list_upcoming(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.ticketing.upcoming_events().await?;
    Ok(success(events, "Upcoming events"))
}

pub async fn create_event(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(body): AppJson<CreateEventRequest>,
) -> Result<Response, AppError> {
    let event = state
        .ticketing
        .create_event(
            &actor,
            EventDraft {
                title: body.title,
                description: body.description,
                scheduled_at: body.scheduled_at,
                venue_id: body.venue_id,
                category_id: body.category_id,
            },
        )
        .await?;
    tracing::info!(event_id = %event.id, organizer_id = %actor.user_id, "Event created");
    Ok(created(event, "Event created"))
}

pub async fn get_event(
    State(state): State<AppState>,
    AppPath(event_id): AppPath<EventId>,
) -> Result<Response, AppError> {
    let detail = state.ticketing.event_detail(event_id).await?;
    Ok(success(detail, "Event found"))
}

pub async fn edit_event(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
    AppJson(body): AppJson<EditEventRequest>,
) -> Result<Response, AppError> {
    let edit = state
        .ticketing
        .edit_event(
            &actor,
            event_id,
            EventPatch {
                title: body.title,
                description: body.description,
                category_id: body.category_id,
                scheduled_at: body.scheduled_at,
                venue_id: body.venue_id,
            },
        )
        .await?;

    match &edit.notification {
        Some(dispatched) => tracing::info!(
            %event_id,
            notification_id = %dispatched.notification.id,
            recipients = dispatched.recipients.len(),
            "Event updated, ticket holders notified"
        ),
        None => tracing::info!(%event_id, "Event updated without significant changes"),
    }
    Ok(success(edit, "Event updated"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
) -> Result<Response, AppError> {
    state.ticketing.delete_event(&actor, event_id).await?;
    tracing::info!(%event_id, "Event deleted");
    Ok(empty_success("Event deleted"))
}

pub async fn get_holders(
    State(state): State<AppState>,
    AppPath(event_id): AppPath<EventId>,
) -> Result<Response, AppError> {
    let holders = state.ticketing.holders(event_id).await?;
    Ok(success(holders, "Ticket holders"))
}
