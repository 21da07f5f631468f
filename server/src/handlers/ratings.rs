use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;

use super::extract::{AppJson, AppPath};
use super::AppState;
use crate::models::{Actor, EventId};
use crate::ticketing::RatingDraft;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub title: String,
    #[serde(default)]
    pub text: Option<String>,
    pub score: i32,
}

pub async fn rate_event(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
    AppJson(body): AppJson<RateRequest>,
) -> Result<Response, AppError> {
    let rating = state
        .ticketing
        .rate_event(
            &actor,
            event_id,
            RatingDraft {
                title: body.title,
                text: body.text,
                score: body.score,
            },
        )
        .await?;
    tracing::info!(%event_id, rating_id = %rating.id, score = rating.score, "Event rated");
    Ok(created(rating, "Rating saved"))
}

pub async fn list_ratings(
    State(state): State<AppState>,
    AppPath(event_id): AppPath<EventId>,
) -> Result<Response, AppError> {
    let ratings = state.ticketing.event_ratings(event_id).await?;
    Ok(success(ratings, "Event ratings"))
}

pub async fn summary(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(event_id): AppPath<EventId>,
) -> Result<Response, AppError> {
    let summary = state.ticketing.rating_summary(&actor, event_id).await?;
    Ok(success(summary, "Average rating"))
}
