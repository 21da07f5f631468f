use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use super::extract::{AppJson, AppPath};
use super::AppState;
use crate::models::{Actor, EventId, NotificationId, NotificationPriority};
use crate::ticketing::NotificationDraft;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: NotificationPriority,
}

#[derive(Serialize)]
struct UnreadPayload {
    unread: i64,
}

pub async fn publish(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
    AppJson(body): AppJson<PublishRequest>,
) -> Result<Response, AppError> {
    let dispatched = state
        .ticketing
        .publish_notification(
            &actor,
            event_id,
            NotificationDraft {
                title: body.title,
                message: body.message,
                priority: body.priority,
            },
        )
        .await?;
    tracing::info!(
        %event_id,
        notification_id = %dispatched.notification.id,
        recipients = dispatched.recipients.len(),
        "Notification published"
    );
    Ok(created(dispatched, "Notification sent"))
}

pub async fn list_for_event(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
) -> Result<Response, AppError> {
    let notifications = state.ticketing.event_notifications(&actor, event_id).await?;
    Ok(success(notifications, "Event notifications"))
}

pub async fn inbox(State(state): State<AppState>, actor: Actor) -> Result<Response, AppError> {
    let entries = state.ticketing.inbox(&actor).await?;
    Ok(success(entries, "Notifications"))
}

pub async fn unread_count(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Response, AppError> {
    let unread = state.ticketing.unread_count(&actor).await?;
    Ok(success(UnreadPayload { unread }, "Unread notifications"))
}

pub async fn mark_read(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(notification_id): AppPath<NotificationId>,
) -> Result<Response, AppError> {
    state.ticketing.mark_read(&actor, notification_id).await?;
    Ok(empty_success("Notification marked as read"))
}
