use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;

use super::extract::{AppJson, AppPath};
use super::AppState;
use crate::models::{Actor, EventId, RefundRequestId};
use crate::ticketing::RefundDraft;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct RefundRequestBody {
    pub ticket_code: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub approve: bool,
}

pub async fn request_refund(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
    AppJson(body): AppJson<RefundRequestBody>,
) -> Result<Response, AppError> {
    let request = state
        .ticketing
        .request_refund(
            &actor,
            event_id,
            RefundDraft {
                ticket_code: body.ticket_code,
                reason: body.reason,
            },
        )
        .await?;
    tracing::info!(
        %event_id,
        request_id = %request.id,
        user_id = %actor.user_id,
        "Refund requested"
    );
    Ok(created(request, "Refund request submitted"))
}

pub async fn decide(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(request_id): AppPath<RefundRequestId>,
    AppJson(body): AppJson<DecisionBody>,
) -> Result<Response, AppError> {
    let request = state
        .ticketing
        .decide_refund(&actor, request_id, body.approve)
        .await?;
    tracing::info!(
        %request_id,
        event_id = %request.event_id,
        approved = body.approve,
        "Refund request decided"
    );
    Ok(success(request, "Refund request decided"))
}

pub async fn mine(State(state): State<AppState>, actor: Actor) -> Result<Response, AppError> {
    let requests = state.ticketing.my_refund_requests(&actor).await?;
    Ok(success(requests, "Refund requests"))
}

pub async fn managed(State(state): State<AppState>, actor: Actor) -> Result<Response, AppError> {
    let requests = state.ticketing.organizer_refund_requests(&actor).await?;
    Ok(success(requests, "Refund requests for your events"))
}
