//! HTTP tests for `/leads`.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, delete_auth, get_auth, patch_json_auth, post_json_auth, put_json_auth, token_for,
};
use leadflow_core::roles::Role;
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: create, read, list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_lead_returns_201_with_defaults() {
    let (app, store) = common::build_test_app();
    let eve = store.seed_user("Eve", Role::Employee).await;
    let token = token_for(&eve);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/leads",
        json!({ "title": "Acme", "customerName": "Wile E.", "priority": "HIGH" }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let lead = &json["data"];
    assert_eq!(lead["title"], "Acme");
    assert_eq!(lead["customer_name"], "Wile E.");
    assert_eq!(lead["priority"], "High");
    assert_eq!(lead["status"], "New");
    assert_eq!(lead["created_by"], eve.id);
    assert!(lead["closed_at"].is_null());

    let id = lead["id"].as_i64().unwrap();
    let response = get_auth(app.clone(), &format!("/api/v1/leads/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(app.clone(), "/api/v1/users/activity", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["entries"][0]["action"], "CREATED");

    let response = get_auth(app, "/api/v1/leads", &token).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn create_lead_rejects_unknown_priority() {
    let (app, store) = common::build_test_app();
    let eve = store.seed_user("Eve", Role::Employee).await;

    let response = post_json_auth(
        app,
        "/api/v1/leads",
        json!({ "title": "Acme", "priority": "urgent" }),
        &token_for(&eve),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn get_missing_lead_is_404() {
    let (app, store) = common::build_test_app();
    let eve = store.seed_user("Eve", Role::Employee).await;

    let response = get_auth(app, "/api/v1/leads/9999", &token_for(&eve)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Lead with id 9999 not found");
}

// ---------------------------------------------------------------------------
// Test: status changes stamp and clear the closure fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closing_and_reopening_over_http() {
    let (app, store) = common::build_test_app();
    let eve = store.seed_user("Eve", Role::Employee).await;
    let lead = store.seed_lead("Acme", eve.id).await;
    let token = token_for(&eve);
    let status_uri = format!("/api/v1/leads/{}/status", lead.id);

    let response = patch_json_auth(app.clone(), &status_uri, json!({ "status": "closed" }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "Closed");
    assert_eq!(json["data"]["closed_by"], eve.id);
    assert!(json["data"]["closed_at"].is_string());

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/leads/{}", lead.id),
        json!({ "status": "New", "notes": "reopened" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "New");
    assert_eq!(json["data"]["notes"], "reopened");
    assert!(json["data"]["closed_by"].is_null());
    assert!(json["data"]["closed_at"].is_null());

    let response = get_auth(app, "/api/v1/users/activity", &token).await;
    let json = body_json(response).await;
    let actions: Vec<_> = json["data"]["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["UPDATED", "CLOSED"]);
}

#[tokio::test]
async fn status_patch_without_status_is_400() {
    let (app, store) = common::build_test_app();
    let eve = store.seed_user("Eve", Role::Employee).await;
    let lead = store.seed_lead("Acme", eve.id).await;

    let response = patch_json_auth(
        app,
        &format!("/api/v1/leads/{}/status", lead.id),
        json!({}),
        &token_for(&eve),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: delete is admin only and keeps history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn employee_cannot_delete_lead() {
    let (app, store) = common::build_test_app();
    let eve = store.seed_user("Eve", Role::Employee).await;
    let lead = store.seed_lead("Acme", eve.id).await;

    let response = delete_auth(
        app,
        &format!("/api/v1/leads/{}", lead.id),
        &token_for(&eve),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.snapshot().await.leads.len(), 1);
}

#[tokio::test]
async fn admin_delete_returns_204_and_logs_title() {
    let (app, store) = common::build_test_app();
    let ada = store.seed_user("Ada", Role::Admin).await;
    let lead = store.seed_lead("Acme", ada.id).await;
    let token = token_for(&ada);

    let response = delete_auth(app.clone(), &format!("/api/v1/leads/{}", lead.id), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app.clone(), &format!("/api/v1/leads/{}", lead.id), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(app, "/api/v1/users/activity", &token).await;
    let json = body_json(response).await;
    let entry = &json["data"]["entries"][0];
    assert_eq!(entry["action"], "DELETED");
    assert_eq!(entry["lead_id"], lead.id);
    assert_eq!(entry["lead_title"], "Acme");
}

// ---------------------------------------------------------------------------
// Test: live channel rejects bad tokens before upgrading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_channel_requires_valid_token() {
    let (app, store) = common::build_test_app();
    let eve = store.seed_user("Eve", Role::Employee).await;
    let lead = store.seed_lead("Acme", eve.id).await;

    let response = common::get(
        app,
        &format!("/api/v1/leads/{}/live?token=bogus", lead.id),
    )
    .await;

    // Not a WebSocket handshake, so either the upgrade extractor or the
    // token check rejects it; it must never be a 2xx.
    assert!(response.status().is_client_error());
}
