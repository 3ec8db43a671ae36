//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tabletop_core::clock::Clock;
use tabletop_core::narration::Narrator;
use tabletop_core::rng::DeterministicRng;
use tabletop_core::store::StateStore;
use tabletop_test_support::{FixedClock, InMemoryStateStore, SequenceRng, StubNarrator};
use tower::ServiceExt;

use tabletop_api::auth::{PRINCIPAL_EMAIL_HEADER, PRINCIPAL_ID_HEADER};
use tabletop_api::state::{AppState, EdgeSettings};

/// Principal that hosts the sessions created through [`create_session`].
pub const HOST: &str = "host-1";

/// Symbol indices yielding the invite code `KA90DB`.
pub const KA90DB: [u32; 6] = [10, 0, 35, 26, 3, 1];

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build application state over the given store, with deterministic
/// Clock/RNG and a canned narrator.
pub fn build_test_state(store: Arc<dyn StateStore>, rng: SequenceRng) -> AppState {
    build_test_state_with_narrator(store, rng, Arc::new(StubNarrator::new("The dust settles.")))
}

/// Same as [`build_test_state`] with a custom narrator.
pub fn build_test_state_with_narrator(
    store: Arc<dyn StateStore>,
    rng: SequenceRng,
    narrator: Arc<dyn Narrator>,
) -> AppState {
    let rng: Arc<Mutex<dyn DeterministicRng>> = Arc::new(Mutex::new(rng));
    AppState::new(fixed_clock(), store, rng, narrator, EdgeSettings::default())
}

/// Build the full app router over an in-memory store. Every session it
/// creates gets the invite code `KA90DB`.
pub fn build_test_app() -> (Router, AppState) {
    let state = build_test_state(
        Arc::new(InMemoryStateStore::new()),
        SequenceRng::new(KA90DB.to_vec()),
    );
    (tabletop_api::app(state.clone()), state)
}

/// Send a request as `principal` and return the status and JSON body.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    principal: Option<&str>,
    body: Option<&Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(principal) = principal {
        builder = builder
            .header(PRINCIPAL_ID_HEADER, principal)
            .header(PRINCIPAL_EMAIL_HEADER, format!("{principal}@example.com"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    principal: &str,
    body: &Value,
) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(principal), Some(body)).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None, None).await
}

/// A quest with two objectives.
pub fn quest() -> Value {
    json!({
        "id": "q-crypt",
        "name": "The Sunken Crypt",
        "description": "Something stirs below the chapel.",
        "objectives": [
            { "id": "o-enter", "description": "Enter the crypt" },
            { "id": "o-seal", "description": "Reseal the tomb" }
        ]
    })
}

/// Creates a session hosted by [`HOST`] and returns its invite code.
pub async fn create_session(app: Router) -> String {
    let (status, json) = post_json(
        app,
        "/api/v1/sessions",
        HOST,
        &json!({ "quest": quest(), "world": { "map": "chapel" }, "starting_area": "nave" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
    json["session"]["invite_code"].as_str().unwrap().to_owned()
}

/// Joins `player_id` with `character_id`.
pub async fn join(app: Router, code: &str, player_id: &str, character_id: &str) -> (StatusCode, Value) {
    post_json(
        app,
        &format!("/api/v1/sessions/{code}/join"),
        player_id,
        &json!({
            "character_id": character_id,
            "character": { "name": character_id, "hp": 10 }
        }),
    )
    .await
}

/// Starts the session as [`HOST`].
pub async fn start(app: Router, code: &str) -> (StatusCode, Value) {
    post_json(
        app,
        &format!("/api/v1/sessions/{code}/start"),
        HOST,
        &json!({ "initial_state": { "turn": 1 } }),
    )
    .await
}

/// Posts a host action as `caller`.
pub async fn dm_action(app: Router, code: &str, caller: &str, action: &Value) -> (StatusCode, Value) {
    post_json(app, &format!("/api/v1/sessions/{code}/dm-action"), caller, action).await
}
