//! Integration tests for the session routes.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::HOST;

#[tokio::test]
async fn test_full_flow_create_join_start_narrate() {
    // Arrange
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;

    // Act
    let (join_status, _) = common::join(app.clone(), &code, "p-1", "c-ilsa").await;
    let (start_status, started) = common::start(app.clone(), &code).await;
    let (narrate_status, _) = common::dm_action(
        app.clone(),
        &code,
        HOST,
        &json!({ "type": "narrate", "content": "You enter a dark room." }),
    )
    .await;
    let (get_status, json) = common::get_json(app, &format!("/api/v1/sessions/{code}")).await;

    // Assert
    assert_eq!(code, "KA90DB");
    assert_eq!(join_status, StatusCode::OK);
    assert_eq!(start_status, StatusCode::OK);
    assert_eq!(started["session"]["status"], "active");
    assert_eq!(narrate_status, StatusCode::OK);
    assert_eq!(get_status, StatusCode::OK);

    let session = &json["session"];
    assert_eq!(session["status"], "active");
    assert_eq!(session["players"].as_array().unwrap().len(), 1);
    assert_eq!(session["players"][0]["display_name"], "p-1@example.com");
    let game_state = &session["game_state"];
    assert_eq!(game_state["current_area"], "nave");
    assert_eq!(game_state["engine_state"], json!({ "turn": 1 }));
    assert_eq!(game_state["messages"].as_array().unwrap().len(), 1);
    assert_eq!(game_state["messages"][0]["speaker"], "Dungeon Master");
    assert_eq!(game_state["messages"][0]["content"], "You enter a dark room.");
    assert_eq!(game_state["messages"][0]["type"], "narration");
}

#[tokio::test]
async fn test_distinct_joins_keep_call_order() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;

    for (player, character) in [("p-3", "c-3"), ("p-1", "c-1"), ("p-2", "c-2")] {
        let (status, _) = common::join(app.clone(), &code, player, character).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, json) = common::get_json(app, &format!("/api/v1/sessions/{code}")).await;

    let roster: Vec<&str> = json["session"]["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["player_id"].as_str().unwrap())
        .collect();
    assert_eq!(roster, ["p-3", "p-1", "p-2"]);
}

#[tokio::test]
async fn test_double_join_is_rejected_and_roster_unchanged() {
    // Arrange
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::join(app.clone(), &code, "p-1", "c-1").await;

    // Act
    let (status, json) = common::join(app.clone(), &code, "p-1", "c-2").await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "duplicate_player");
    let (_, current) = common::get_json(app, &format!("/api/v1/sessions/{code}")).await;
    assert_eq!(current["session"]["players"].as_array().unwrap().len(), 1);
    assert_eq!(current["session"]["players"][0]["character_id"], "c-1");
}

#[tokio::test]
async fn test_join_unknown_session_returns_404() {
    let (app, _) = common::build_test_app();

    let (status, json) = common::join(app, "ZZZZZZ", "p-1", "c-1").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_join_after_start_returns_400() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::start(app.clone(), &code).await;

    let (status, json) = common::join(app, &code, "p-late", "c-late").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_state");
}

#[tokio::test]
async fn test_non_host_start_is_forbidden_and_session_stays_waiting() {
    // Arrange
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::join(app.clone(), &code, "p-1", "c-1").await;

    // Act
    let (status, json) = common::post_json(
        app.clone(),
        &format!("/api/v1/sessions/{code}/start"),
        "p-1",
        &json!({}),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "unauthorized");
    let (_, current) = common::get_json(app, &format!("/api/v1/sessions/{code}")).await;
    assert_eq!(current["session"]["status"], "waiting");
    assert!(current["session"]["game_state"].is_null());
}

#[tokio::test]
async fn test_second_start_returns_400() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::start(app.clone(), &code).await;

    let (status, json) = common::start(app, &code).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_state");
}

#[tokio::test]
async fn test_narrations_keep_commit_order() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::start(app.clone(), &code).await;

    for content in ["A", "B"] {
        common::dm_action(
            app.clone(),
            &code,
            HOST,
            &json!({ "type": "narrate", "content": content }),
        )
        .await;
    }
    let (_, json) = common::get_json(app, &format!("/api/v1/sessions/{code}")).await;

    let contents: Vec<&str> = json["session"]["game_state"]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["A", "B"]);
}

#[tokio::test]
async fn test_update_character_merges_fields() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::join(app.clone(), &code, "p-1", "c-1").await;
    common::start(app.clone(), &code).await;

    let (status, json) = common::dm_action(
        app,
        &code,
        HOST,
        &json!({
            "type": "updateCharacter",
            "character_id": "c-1",
            "updates": { "hp": 4, "conditions": ["poisoned"] }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["session"]["game_state"]["characters"]["c-1"],
        json!({ "name": "c-1", "hp": 4, "conditions": ["poisoned"] })
    );
}

#[tokio::test]
async fn test_completing_every_objective_ends_the_session() {
    // Arrange
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::start(app.clone(), &code).await;

    // Act
    common::dm_action(
        app.clone(),
        &code,
        HOST,
        &json!({ "type": "advanceStory", "completed_objective": "o-enter" }),
    )
    .await;
    let (status, json) = common::dm_action(
        app.clone(),
        &code,
        HOST,
        &json!({
            "type": "advanceStory",
            "completed_objective": "o-seal",
            "narration": "The tomb falls silent."
        }),
    )
    .await;
    let (after_status, after) = common::dm_action(
        app,
        &code,
        HOST,
        &json!({ "type": "narrate", "content": "Epilogue" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"]["status"], "completed");
    assert_eq!(json["session"]["game_state"]["story_beat"], 2);
    assert_eq!(after_status, StatusCode::BAD_REQUEST);
    assert_eq!(after["error"], "session_closed");
}

#[tokio::test]
async fn test_non_host_dm_action_is_forbidden() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::join(app.clone(), &code, "p-1", "c-1").await;
    common::start(app.clone(), &code).await;

    let (status, json) = common::dm_action(
        app,
        &code,
        "p-1",
        &json!({ "type": "narrate", "content": "I win." }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn test_player_action_before_start_returns_400() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::join(app.clone(), &code, "p-1", "c-1").await;

    let (status, json) = common::post_json(
        app,
        &format!("/api/v1/sessions/{code}/action"),
        "p-1",
        &json!({ "character_id": "c-1", "action": { "verb": "look" } }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_state");
}

#[tokio::test]
async fn test_player_action_does_not_change_game_state() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::join(app.clone(), &code, "p-1", "c-1").await;
    let (_, started) = common::start(app.clone(), &code).await;

    let (status, _) = common::post_json(
        app.clone(),
        &format!("/api/v1/sessions/{code}/action"),
        "p-1",
        &json!({ "character_id": "c-1", "action": { "verb": "attack" } }),
    )
    .await;
    let (_, current) = common::get_json(app, &format!("/api/v1/sessions/{code}")).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(current["session"], started["session"]);
}

#[tokio::test]
async fn test_cancel_by_non_host_is_forbidden() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;

    let (status, json) = common::send(
        app,
        "POST",
        &format!("/api/v1/sessions/{code}/cancel"),
        Some("p-1"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn test_ws_without_params_returns_422() {
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;

    let (status, json) = common::get_json(app, &format!("/api/v1/sessions/{code}/ws?playerId=p-1")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "malformed_request");
}

#[tokio::test]
async fn test_ws_for_unknown_session_returns_404() {
    let (app, _) = common::build_test_app();

    let (status, json) = common::get_json(
        app,
        "/api/v1/sessions/ZZZZZZ/ws?playerId=p-1&characterId=c-1",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_ws_for_pair_outside_roster_returns_403() {
    // Arrange
    let (app, _) = common::build_test_app();
    let code = common::create_session(app.clone()).await;
    common::join(app.clone(), &code, "p-1", "c-1").await;

    // Act
    let (foreign_status, foreign) = common::get_json(
        app.clone(),
        &format!("/api/v1/sessions/{code}/ws?playerId=p-1&characterId=c-2"),
    )
    .await;
    let (stranger_status, _) = common::get_json(
        app,
        &format!("/api/v1/sessions/{code}/ws?playerId=p-9&characterId=c-1"),
    )
    .await;

    // Assert
    assert_eq!(foreign_status, StatusCode::FORBIDDEN);
    assert_eq!(foreign["error"], "invalid_player");
    assert_eq!(stranger_status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_session_lookups_are_not_counted_in_health() {
    // Arrange
    let (app, _) = common::build_test_app();

    // Act
    for code in ["ZZZZZZ", "YYYYYY", "XXXXXX"] {
        let (status, _) = common::get_json(app.clone(), &format!("/api/v1/sessions/{code}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (_, health) = common::get_json(app, "/health").await;

    // Assert
    assert_eq!(health["sessions"], 0);
}

