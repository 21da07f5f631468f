use axum::response::Response;
use serde::Serialize;

use crate::ticketing::Ticketing;
use crate::utils::response::success;

pub mod actor;
pub mod events;
pub mod extract;
pub mod notifications;
pub mod ratings;
pub mod refunds;
pub mod tickets;
pub mod venues;

#[derive(Clone)]
pub struct AppState {
    pub ticketing: Ticketing,
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "eventhub-api",
    };

    success(payload, "Health check successful")
}
