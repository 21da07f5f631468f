use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers, Config};
use crate::handlers::{
    events, health_check, notifications, ratings, refunds, tickets, venues, AppState,
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/venues", post(venues::create_venue))
        .route(
            "/venues/:venue_id",
            get(venues::get_venue).delete(venues::delete_venue),
        )
        .route(
            "/events",
            get(events::list_upcoming).post(events::create_event),
        )
        .route(
            "/events/:event_id",
            get(events::get_event)
                .put(events::edit_event)
                .delete(events::delete_event),
        )
        .route("/events/:event_id/holders", get(events::get_holders))
        .route("/events/:event_id/tickets", post(tickets::purchase))
        .route("/events/:event_id/ticket-limit", get(tickets::check_limit))
        .route(
            "/events/:event_id/notifications",
            get(notifications::list_for_event).post(notifications::publish),
        )
        .route(
            "/events/:event_id/ratings",
            get(ratings::list_ratings).post(ratings::rate_event),
        )
        .route("/events/:event_id/ratings/summary", get(ratings::summary))
        .route(
            "/events/:event_id/refund-requests",
            post(refunds::request_refund),
        )
        .route("/refund-requests", get(refunds::mine))
        .route("/refund-requests/managed", get(refunds::managed))
        .route(
            "/refund-requests/:request_id/decision",
            post(refunds::decide),
        )
        .route(
            "/tickets/:ticket_id",
            put(tickets::edit_ticket).delete(tickets::refund_ticket),
        )
        .route("/notifications", get(notifications::inbox))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/notifications/:notification_id/read",
            post(notifications::mark_read),
        )
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .merge(api_routes())
        .with_state(state);

    with_security_headers(router, config.production).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&config.cors_allowed_origins)),
    )
}
