mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, body_json, body_text, seed_item};
use serde_json::{Value, json};

/// Owner with a SELL listing and a buyer, both with contact handles.
async fn marketplace(app: &TestApp) -> (String, String, String) {
    let (_, owner_token) = app.user("owner", Some("Owner#0001")).await;
    let (_, buyer_token) = app.user("buyer", Some("Buyer#0002")).await;
    let item = seed_item(&app.state.db, "Anvil").await;

    let (status, body) = app
        .post(
            "/api/listings",
            Some(&owner_token),
            json!({ "item_id": item.id, "kind": "SELL", "quantity": 1, "price": "2x Arc Alloy" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let listing_id = body["data"]["id"].as_str().unwrap().to_string();

    (owner_token, buyer_token, listing_id)
}

async fn open_chat(app: &TestApp, token: &str, listing_id: &str) -> (StatusCode, Value) {
    app.post("/api/chats", Some(token), json!({ "listing_id": listing_id }))
        .await
}

#[tokio::test]
async fn health_check_is_public() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/auth/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn pages_outside_the_api_go_to_the_frontend() {
    let app = TestApp::new().await;

    // The test frontend address has nothing listening.
    let response = app.request(Method::GET, "/market/anvil?rarity=rare", None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_text(response).await, "Frontend not available");
}

#[tokio::test]
async fn chat_routes_require_a_token() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/chats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = app.get("/api/chats", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn marketplace_reads_are_public_but_writes_are_not() {
    let app = TestApp::new().await;
    let (_, _, listing_id) = marketplace(&app).await;

    let (status, body) = app.get("/api/listings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], listing_id.as_str());
    assert_eq!(body["data"][0]["item"]["name"], "Anvil");

    let (status, body) = app.get("/api/items?rarity=rare", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .post("/api/listings", None, json!({ "item_id": "x", "kind": "BUY", "quantity": 1, "price": "1" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/listings?limit=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn full_negotiation_over_http() {
    let app = TestApp::new().await;
    let (owner_token, buyer_token, listing_id) = marketplace(&app).await;

    let (status, body) = open_chat(&app, &buyer_token, &listing_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["created"], true);
    let chat_id = body["data"]["chat_id"].as_str().unwrap().to_string();

    let (status, body) = open_chat(&app, &buyer_token, &listing_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["chat_id"], chat_id.as_str());
    assert_eq!(body["data"]["created"], false);

    let (status, body) = app
        .get(&format!("/api/listings/{}/chat-status", listing_id), Some(&buyer_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_active_chat"], true);

    let (status, _) = app
        .post(
            &format!("/api/chats/{}/messages", chat_id),
            Some(&buyer_token),
            json!({ "content": "Still have it?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app
        .get(&format!("/api/chats/{}/messages", chat_id), Some(&owner_token))
        .await;
    assert_eq!(body["data"][0]["content"], "Still have it?");
    assert_eq!(body["data"][0]["sender_username"], "buyer");

    let (status, body) = app
        .post(&format!("/api/chats/{}/lock-in", chat_id), Some(&owner_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["both_locked_in"], false);
    assert!(body["data"]["participant1"]["contact"].is_null());

    let (_, body) = app
        .post(&format!("/api/chats/{}/lock-in", chat_id), Some(&buyer_token), json!({}))
        .await;
    assert_eq!(body["data"]["both_locked_in"], true);
    assert_eq!(body["data"]["participant1"]["contact"], "Owner#0001");
    assert_eq!(body["data"]["participant2"]["contact"], "Buyer#0002");

    let (_, body) = app
        .post(&format!("/api/chats/{}/approve", chat_id), Some(&owner_token), json!({}))
        .await;
    assert_eq!(body["data"]["both_approved"], false);
    assert_eq!(body["data"]["status"], "ACTIVE");

    let (_, body) = app
        .post(&format!("/api/chats/{}/approve", chat_id), Some(&buyer_token), json!({}))
        .await;
    assert_eq!(body["data"]["both_approved"], true);
    assert_eq!(body["data"]["status"], "COMPLETED");

    let (status, body) = app
        .post(&format!("/api/chats/{}/leave", chat_id), Some(&buyer_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (_, body) = app.get(&format!("/api/chats/{}", chat_id), Some(&buyer_token)).await;
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert_eq!(body["data"]["listing"]["id"], listing_id.as_str());
}

#[tokio::test]
async fn chat_errors_use_the_error_envelope() {
    let app = TestApp::new().await;
    let (owner_token, buyer_token, listing_id) = marketplace(&app).await;
    let (_, stranger_token) = app.user("stranger", None).await;

    let (_, body) = open_chat(&app, &buyer_token, &listing_id).await;
    let chat_id = body["data"]["chat_id"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/api/chats/{}", chat_id), Some(&stranger_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(body["message"].is_string());

    let (status, body) = app.get("/api/chats/does-not-exist", Some(&buyer_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = app
        .post(
            &format!("/api/chats/{}/messages", chat_id),
            Some(&buyer_token),
            json!({ "content": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = open_chat(&app, &owner_token, &listing_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn completed_trades_can_be_rated_once() {
    let app = TestApp::new().await;
    let (owner_token, buyer_token, listing_id) = marketplace(&app).await;

    let (_, body) = open_chat(&app, &buyer_token, &listing_id).await;
    let chat_id = body["data"]["chat_id"].as_str().unwrap().to_string();
    for token in [&owner_token, &buyer_token] {
        app.post(&format!("/api/chats/{}/approve", chat_id), Some(token), json!({}))
            .await;
    }

    let (_, body) = app.get("/api/trades", Some(&buyer_token)).await;
    let trade_id = body["data"][0]["id"].as_str().unwrap().to_string();
    let owner_id = body["data"][0]["seller_id"].as_str().unwrap().to_string();

    let rating = json!({ "score": 5, "comment": "Smooth trade" });
    let (status, body) = app
        .post(&format!("/api/trades/{}/ratings", trade_id), Some(&buyer_token), rating.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["ratee_id"], owner_id.as_str());

    let (status, body) = app
        .post(&format!("/api/trades/{}/ratings", trade_id), Some(&buyer_token), rating)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, body) = app.get(&format!("/api/users/{}", owner_id), None).await;
    assert_eq!(body["error"], "unauthenticated");

    let (status, body) = app.get(&format!("/api/users/{}", owner_id), Some(&buyer_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rating"]["count"], 1);
    assert_eq!(body["data"]["rating"]["average"], 5.0);
    assert!(body["data"].get("embark_id").is_none());
}

#[tokio::test]
async fn notifications_can_be_marked_read() {
    let app = TestApp::new().await;
    let (owner_token, buyer_token, listing_id) = marketplace(&app).await;
    open_chat(&app, &buyer_token, &listing_id).await;

    let (_, body) = app.get("/api/notifications?unread_only=true", Some(&owner_token)).await;
    let notes = body["data"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["kind"], "chat_started");
    let id = notes[0]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(&format!("/api/notifications/{}/read", id), Some(&owner_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_read"], true);

    let (_, body) = app.get("/api/notifications?unread_only=true", Some(&owner_token)).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = app
        .post(&format!("/api/notifications/{}/read", id), Some(&buyer_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn banned_users_are_locked_out() {
    let app = TestApp::new().await;
    let (owner_token, buyer_token, _) = marketplace(&app).await;

    let (_, body) = app.get("/api/users/me", Some(&buyer_token)).await;
    let buyer_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(&format!("/api/admin/users/{}/ban", buyer_id), Some(&buyer_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The first account registered is the admin.
    let (status, body) = app
        .post(&format!("/api/admin/users/{}/ban", buyer_id), Some(&owner_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_banned"], true);

    let (status, body) = app.get("/api/chats", Some(&buyer_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .post("/api/auth/login", None, json!({ "username": "buyer", "password": "correct-horse" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.post(&format!("/api/admin/users/{}/unban", buyer_id), Some(&owner_token), json!({}))
        .await;
    let (status, _) = app.get("/api/chats", Some(&buyer_token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_contact_handle_can_be_updated() {
    let app = TestApp::new().await;
    let (_, token) = app.user("raider", None).await;

    let response = app
        .request(Method::PATCH, "/api/users/me", Some(&token), Some(json!({ "embark_id": "nope" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::PATCH,
            "/api/users/me",
            Some(&token),
            Some(json!({ "embark_id": "Raider#4242" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["embark_id"], "Raider#4242");
}

#[tokio::test]
async fn login_returns_a_usable_token() {
    let app = TestApp::new().await;
    app.user("raider", None).await;

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "username": "RAIDER", "password": "correct-horse" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "raider");

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "username": "raider", "password": "wrong-password" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}
