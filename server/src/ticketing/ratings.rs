//! Event ratings. The average is shown to the event's organizer only.

use serde::Serialize;

use super::{non_empty, InputError, Ticketing, TicketingError};
use crate::models::rating::{MAX_SCORE, MIN_SCORE};
use crate::models::{Actor, EventId, NewRating, Rating};

#[derive(Debug, Clone)]
pub struct RatingDraft {
    pub title: String,
    pub text: Option<String>,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    /// `None` until the first rating arrives.
    pub average: Option<f64>,
    pub count: usize,
}

/// Mean of the scores, or `None` for an unrated event.
pub fn average(scores: &[i32]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let total: i64 = scores.iter().map(|&s| i64::from(s)).sum();
    Some(total as f64 / scores.len() as f64)
}

pub fn validate_score(score: i32) -> Result<i32, InputError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(score)
    } else {
        Err(InputError::ScoreOutOfRange(score))
    }
}

impl Ticketing {
    pub async fn rate_event(
        &self,
        actor: &Actor,
        event_id: EventId,
        draft: RatingDraft,
    ) -> Result<Rating, TicketingError> {
        let score = validate_score(draft.score)?;
        let title = non_empty("title", draft.title)?;
        self.event(event_id).await?;
        let rating = NewRating {
            event_id,
            user_id: actor.user_id,
            title,
            text: draft.text.unwrap_or_default(),
            score,
            created_at: self.clock.now(),
        };
        Ok(self.store.insert_rating(rating).await?)
    }

    pub async fn event_ratings(&self, event_id: EventId) -> Result<Vec<Rating>, TicketingError> {
        self.event(event_id).await?;
        Ok(self.store.event_ratings(event_id).await?)
    }

    pub async fn rating_summary(
        &self,
        actor: &Actor,
        event_id: EventId,
    ) -> Result<RatingSummary, TicketingError> {
        let event = self.event(event_id).await?;
        if event.organizer_id != actor.user_id {
            return Err(TicketingError::Forbidden(
                "only the event organizer can see its average rating",
            ));
        }
        let scores: Vec<i32> = self
            .store
            .event_ratings(event_id)
            .await?
            .iter()
            .map(|r| r.score)
            .collect();
        Ok(RatingSummary {
            average: average(&scores),
            count: scores.len(),
        })
    }
}
