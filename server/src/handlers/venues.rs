use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;

use super::extract::{AppJson, AppPath};
use super::AppState;
use crate::models::{Actor, NewVenue, VenueId};
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Deserialize)]
pub struct CreateVenueRequest {
    pub name: String,
    pub address: String,
    pub city: String,
    pub capacity: i32,
    #[serde(default)]
    pub contact: String,
}

pub async fn create_venue(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(body): AppJson<CreateVenueRequest>,
) -> Result<Response, AppError> {
    let venue = state
        .ticketing
        .create_venue(
            &actor,
            NewVenue {
                name: body.name,
                address: body.address,
                city: body.city,
                capacity: body.capacity,
                contact: body.contact,
            },
        )
        .await?;
    tracing::info!(venue_id = %venue.id, capacity = venue.capacity, "Venue created");
    Ok(created(venue, "Venue created"))
}

pub async fn get_venue(
    State(state): State<AppState>,
    AppPath(venue_id): AppPath<VenueId>,
) -> Result<Response, AppError> {
    let venue = state.ticketing.venue(venue_id).await?;
    Ok(success(venue, "Venue found"))
}

pub async fn delete_venue(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(venue_id): AppPath<VenueId>,
) -> Result<Response, AppError> {
    state.ticketing.delete_venue(&actor, venue_id).await?;
    tracing::info!(%venue_id, "Venue deleted");
    Ok(empty_success("Venue deleted"))
}
