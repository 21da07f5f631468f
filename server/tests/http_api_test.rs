mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{fixture, Fixture};
use eventhub_server::config::{Config, StoreBackend};
use eventhub_server::handlers::AppState;
use eventhub_server::models::{Actor, UserId};
use eventhub_server::routes::create_routes;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        max_connections: 1,
        store_backend: StoreBackend::Memory,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        cors_allowed_origins: "http://localhost:3000".to_string(),
        production: false,
    }
}

fn app(f: &Fixture) -> Router {
    let state = AppState {
        ticketing: f.ticketing.clone(),
    };
    create_routes(state, &test_config())
}

fn request(method: &str, uri: &str, actor: Option<&Actor>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header("x-user-id", actor.user_id.to_string())
            .header(
                "x-user-role",
                if actor.is_organizer() { "organizer" } else { "regular" },
            );
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let f = fixture(10).await;
    let (status, body) = send(&app(&f), request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_purchase_over_http() {
    let f = fixture(10).await;
    let app = app(&f);
    let buyer = Actor::regular(UserId::new());
    let uri = format!("/events/{}/tickets", f.event.id);

    let (status, body) = send(
        &app,
        request(
            "POST",
            &uri,
            Some(&buyer),
            Some(json!({ "quantity": 3, "ticket_type": "vip" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["quantity"], 3);
    assert_eq!(body["data"]["ticket_type"], "VIP");
    assert_eq!(body["data"]["ticket_code"].as_str().unwrap().len(), 8);

    let (status, body) = send(
        &app,
        request(
            "POST",
            &uri,
            Some(&buyer),
            Some(json!({ "quantity": 2, "ticket_type": "GENERAL" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "ACCUMULATED_LIMIT_EXCEEDED");
    assert_eq!(body["error"]["details"]["current"], 3);
    assert_eq!(body["error"]["details"]["would_be_total"], 5);
}

#[tokio::test]
async fn test_sold_out_reports_zero_available() {
    let f = fixture(2).await;
    let app = app(&f);
    let uri = format!("/events/{}/tickets", f.event.id);

    let first = Actor::regular(UserId::new());
    let (status, _) = send(
        &app,
        request(
            "POST",
            &uri,
            Some(&first),
            Some(json!({ "quantity": 2, "ticket_type": "GENERAL" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let second = Actor::regular(UserId::new());
    let (status, body) = send(
        &app,
        request(
            "POST",
            &uri,
            Some(&second),
            Some(json!({ "quantity": 1, "ticket_type": "GENERAL" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CAPACITY_EXCEEDED");
    assert_eq!(body["error"]["details"]["available"], 0);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let f = fixture(10).await;
    let uri = format!("/events/{}/tickets", f.event.id);
    let (status, body) = send(
        &app(&f),
        request(
            "POST",
            &uri,
            None,
            Some(json!({ "quantity": 1, "ticket_type": "GENERAL" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_invalid_ticket_type_is_bad_request() {
    let f = fixture(10).await;
    let buyer = Actor::regular(UserId::new());
    let uri = format!("/events/{}/tickets", f.event.id);
    let (status, body) = send(
        &app(&f),
        request(
            "POST",
            &uri,
            Some(&buyer),
            Some(json!({ "quantity": 1, "ticket_type": "PALCO" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_ticket_limit_preview() {
    let f = fixture(10).await;
    let buyer = Actor::regular(UserId::new());
    f.ticketing
        .purchase(&buyer, f.event.id, 1, "GENERAL")
        .await
        .unwrap();

    let uri = format!("/events/{}/ticket-limit?cantidad=2", f.event.id);
    let (status, body) = send(&app(&f), request("GET", &uri, Some(&buyer), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_count"], 1);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["ok"], true);
}

#[tokio::test]
async fn test_event_detail_and_edit_flow() {
    let f = fixture(10).await;
    let app = app(&f);
    let holder = Actor::regular(UserId::new());
    f.ticketing
        .purchase(&holder, f.event.id, 2, "GENERAL")
        .await
        .unwrap();

    let uri = format!("/events/{}", f.event.id);
    let (status, body) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available_seats"], 8);
    assert_eq!(body["data"]["countdown_label"], "Faltan 14 días");

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &uri,
            Some(&f.organizer),
            Some(json!({
                "scheduled_at": "2025-06-16T23:00:00Z",
                "venue_id": f.venue.id,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["notification"]["notification"]["title"],
        "Cambios en el evento"
    );

    let (status, body) = send(
        &app,
        request("GET", "/notifications/unread-count", Some(&holder), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["unread"], 1);
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let f = fixture(10).await;
    let uri = format!("/events/{}", eventhub_server::models::EventId::new());
    let (status, body) = send(&app(&f), request("GET", &uri, None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_integer_quantity_uses_the_error_envelope() {
    let f = fixture(10).await;
    let buyer = Actor::regular(UserId::new());
    let uri = format!("/events/{}/tickets", f.event.id);
    let (status, body) = send(
        &app(&f),
        request(
            "POST",
            &uri,
            Some(&buyer),
            Some(json!({ "quantity": "abc", "ticket_type": "GENERAL" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("quantity"));
    assert_eq!(f.sold().await, 0);
}

#[tokio::test]
async fn test_malformed_ids_and_queries_use_the_error_envelope() {
    let f = fixture(10).await;
    let app = app(&f);
    let buyer = Actor::regular(UserId::new());

    let (status, body) = send(&app, request("GET", "/events/not-a-uuid", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let uri = format!("/events/{}/ticket-limit?quantity=many", f.event.id);
    let (status, body) = send(&app, request("GET", &uri, Some(&buyer), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_huge_limit_preview_over_http() {
    let f = fixture(10).await;
    let buyer = Actor::regular(UserId::new());
    f.ticketing
        .purchase(&buyer, f.event.id, 1, "GENERAL")
        .await
        .unwrap();

    let uri = format!("/events/{}/ticket-limit?quantity={}", f.event.id, i32::MAX);
    let (status, body) = send(&app(&f), request("GET", &uri, Some(&buyer), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ok"], false);
    assert_eq!(body["data"]["total"], i32::MAX);
}

#[tokio::test]
async fn test_refund_request_flow_over_http() {
    let f = fixture(10).await;
    let app = app(&f);
    let holder = Actor::regular(UserId::new());
    let ticket = f
        .ticketing
        .purchase(&holder, f.event.id, 2, "GENERAL")
        .await
        .unwrap();

    let uri = format!("/events/{}/refund-requests", f.event.id);
    let (status, body) = send(
        &app,
        request(
            "POST",
            &uri,
            Some(&holder),
            Some(json!({ "ticket_code": ticket.ticket_code, "reason": "Viaje" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["approved"], Value::Null);
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request("GET", "/refund-requests/managed", Some(&f.organizer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let uri = format!("/refund-requests/{request_id}/decision");
    let (status, body) = send(
        &app,
        request("POST", &uri, Some(&holder), Some(json!({ "approve": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = send(
        &app,
        request("POST", &uri, Some(&f.organizer), Some(json!({ "approve": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["approved"], true);
    assert_eq!(f.sold().await, 0);

    let (status, body) = send(
        &app,
        request("POST", &uri, Some(&f.organizer), Some(json!({ "approve": false }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "REFUND_ALREADY_DECIDED");
}

#[tokio::test]
async fn test_rating_summary_is_organizer_only_over_http() {
    let f = fixture(10).await;
    let app = app(&f);
    let fan = Actor::regular(UserId::new());

    let uri = format!("/events/{}/ratings", f.event.id);
    let (status, _) = send(
        &app,
        request(
            "POST",
            &uri,
            Some(&fan),
            Some(json!({ "title": "Excelente", "score": 4 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/events/{}/ratings/summary", f.event.id);
    let (status, _) = send(&app, request("GET", &uri, Some(&fan), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request("GET", &uri, Some(&f.organizer), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["average"], 4.0);
    assert_eq!(body["data"]["count"], 1);
}
