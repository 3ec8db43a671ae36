//! Integration tests for `PgStateStore`.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use sqlx::PgPool;
use tabletop_core::error::DomainError;
use tabletop_core::store::{Checkpoint, StateStore};
use tabletop_state_store::pg_state_store::PgStateStore;
use uuid::Uuid;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// Helper to build a `Checkpoint` with sensible defaults.
fn make_checkpoint(invite_code: &str, state: serde_json::Value) -> Checkpoint {
    Checkpoint {
        session_id: Uuid::new_v4(),
        invite_code: invite_code.to_owned(),
        state,
        updated_at: fixed_now(),
    }
}

// --- load ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_load_returns_none_for_unknown_session(pool: PgPool) {
    let store = PgStateStore::new(pool);

    let loaded = store.load(Uuid::new_v4()).await.unwrap();

    assert!(loaded.is_none());
}

// --- create + load round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_then_load_returns_same_checkpoint(pool: PgPool) {
    let store = PgStateStore::new(pool);
    let checkpoint = make_checkpoint("ABC123", json!({ "status": "waiting", "players": [] }));

    store.create(&checkpoint).await.unwrap();
    let loaded = store.load(checkpoint.session_id).await.unwrap();

    assert_eq!(loaded, Some(checkpoint));
}

// --- uniqueness ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_with_taken_invite_code_fails_without_overwrite(pool: PgPool) {
    let store = PgStateStore::new(pool);
    let original = make_checkpoint("ABC123", json!({ "owner": "first" }));
    let colliding = make_checkpoint("ABC123", json!({ "owner": "second" }));
    store.create(&original).await.unwrap();

    let result = store.create(&colliding).await;

    match result {
        Err(DomainError::AlreadyExists(_)) => {}
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
    let loaded = store.load(original.session_id).await.unwrap().unwrap();
    assert_eq!(loaded.state, json!({ "owner": "first" }));
    assert!(store.load(colliding.session_id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_twice_for_same_session_fails(pool: PgPool) {
    let store = PgStateStore::new(pool);
    let checkpoint = make_checkpoint("ABC123", json!({}));
    store.create(&checkpoint).await.unwrap();

    let result = store.create(&checkpoint).await;

    assert!(matches!(result, Err(DomainError::AlreadyExists(_))));
}

// --- save ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_replaces_state(pool: PgPool) {
    let store = PgStateStore::new(pool);
    let mut checkpoint = make_checkpoint("ABC123", json!({ "status": "waiting" }));
    store.create(&checkpoint).await.unwrap();

    checkpoint.state = json!({ "status": "active" });
    checkpoint.updated_at = fixed_now() + chrono::Duration::minutes(1);
    store.save(&checkpoint).await.unwrap();

    let loaded = store.load(checkpoint.session_id).await.unwrap().unwrap();
    assert_eq!(loaded.state, json!({ "status": "active" }));
    assert_eq!(loaded.updated_at, checkpoint.updated_at);
}

// --- isolation ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_sessions_are_isolated(pool: PgPool) {
    let store = PgStateStore::new(pool);
    let a = make_checkpoint("AAAAAA", json!({ "name": "a" }));
    let b = make_checkpoint("BBBBBB", json!({ "name": "b" }));

    store.create(&a).await.unwrap();
    store.create(&b).await.unwrap();

    assert_eq!(store.load(a.session_id).await.unwrap().unwrap().state, json!({ "name": "a" }));
    assert_eq!(store.load(b.session_id).await.unwrap().unwrap().state, json!({ "name": "b" }));
}
