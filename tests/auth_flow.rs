// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end checks of the `ms-auth` router.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use labsuite::{
    api::auth_router, auth::KeyMaterial, services::users::seed_admin, state::AuthState,
    storage::CredentialStore,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const PUBLIC: &str = include_str!("fixtures/signing_public.pem");
const PRIVATE: &str = include_str!("fixtures/signing_private.pem");

struct Harness {
    _dir: TempDir,
    app: Router,
    state: AuthState,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::open(&dir.path().join("auth.redb")).unwrap();
    seed_admin(&store, "admin", "admin-password", "admin@example.com").unwrap();
    let keys = KeyMaterial::from_pem(PUBLIC, PRIVATE).unwrap();
    let state = AuthState::new(store, keys, "ms-auth", 60);
    let app = auth_router(state.clone(), &["http://localhost:3000".to_string()]);
    Harness {
        _dir: dir,
        app,
        state,
    }
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await
}

async fn admin_token(app: &Router) -> String {
    let (status, body) = login(app, "admin", "admin-password").await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn tech_body() -> Value {
    json!({
        "username": "tech1",
        "email": "tech1@example.com",
        "password": "password123",
        "labCode": "LAB01",
        "roles": ["LAB_TECH"],
        "active": true
    })
}

#[tokio::test]
async fn login_returns_token_with_embedded_claims() {
    let h = harness();
    let admin = admin_token(&h.app).await;
    let (status, _) = call(&h.app, Method::POST, "/users", Some(&admin), Some(tech_body())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = login(&h.app, "tech1", "password123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "tech1");
    assert_eq!(body["roles"], json!(["LAB_TECH"]));
    assert_eq!(body["labCode"], "LAB01");
    assert!(body["expiresAt"].is_string());

    let claims = h
        .state
        .verifier
        .verify(body["token"].as_str().unwrap())
        .await
        .expect("token verifies");
    assert_eq!(claims.sub, "tech1");
    assert_eq!(claims.lab_code.as_deref(), Some("LAB01"));
    assert_eq!(claims.user_id.as_deref(), body["userId"].as_str());
}

#[tokio::test]
async fn bad_credentials_share_one_message() {
    let h = harness();

    let (status, wrong_password) = login(&h.app, "admin", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown_user) = login(&h.app, "nobody", "whatever-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_password["message"], unknown_user["message"]);
    assert_eq!(wrong_password["path"], "/auth/login");
}

#[tokio::test]
async fn short_password_fails_validation() {
    let h = harness();
    let (status, body) = login(&h.app, "admin", "short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["password"].is_string());
}

#[tokio::test]
async fn inactive_account_cannot_log_in() {
    let h = harness();
    let admin = admin_token(&h.app).await;
    let mut body = tech_body();
    body["active"] = json!(false);
    call(&h.app, Method::POST, "/users", Some(&admin), Some(body)).await;

    let (status, body) = login(&h.app, "tech1", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account inactive");
}

#[tokio::test]
async fn missing_token_yields_401_envelope() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/users", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["path"], "/users");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn tampered_token_is_treated_as_absent() {
    let h = harness();
    let mut token = admin_token(&h.app).await;
    token.push('x');

    let (status, _) = call(&h.app, Method::GET, "/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lab_tech_cannot_administer_users() {
    let h = harness();
    let admin = admin_token(&h.app).await;
    call(&h.app, Method::POST, "/users", Some(&admin), Some(tech_body())).await;
    let (_, login) = login(&h.app, "tech1", "password123").await;
    let tech = login["token"].as_str().unwrap();

    let (status, body) = call(&h.app, Method::GET, "/users", Some(tech), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["path"], "/users");

    let (status, me) = call(&h.app, Method::GET, "/users/me", Some(tech), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "tech1");
    assert!(me.get("passwordHash").is_none());
}

#[tokio::test]
async fn lab_tech_requires_lab_code() {
    let h = harness();
    let admin = admin_token(&h.app).await;
    let mut body = tech_body();
    body.as_object_mut().unwrap().remove("labCode");

    let (status, body) = call(&h.app, Method::POST, "/users", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "labCode is required for LAB_TECH");

    let (_, users) = call(&h.app, Method::GET, "/users", Some(&admin), None).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let h = harness();
    let admin = admin_token(&h.app).await;
    call(&h.app, Method::POST, "/users", Some(&admin), Some(tech_body())).await;

    let mut again = tech_body();
    again["email"] = json!("other@example.com");
    let (status, body) = call(&h.app, Method::POST, "/users", Some(&admin), Some(again)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "username already in use");
}

#[tokio::test]
async fn user_update_and_delete() {
    let h = harness();
    let admin = admin_token(&h.app).await;
    let (_, created) =
        call(&h.app, Method::POST, "/users", Some(&admin), Some(tech_body())).await;
    let uri = format!("/users/{}", created["id"]);

    let (status, updated) = call(
        &h.app,
        Method::PUT,
        &uri,
        Some(&admin),
        Some(json!({"labCode": "LAB02"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["labCode"], "LAB02");

    let (status, body) = call(&h.app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = call(&h.app, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn roles_catalog_lists_seeded_roles() {
    let h = harness();
    let admin = admin_token(&h.app).await;
    let (status, body) = call(&h.app, Method::GET, "/roles", Some(&admin), None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"ADMIN"));
    assert!(names.contains(&"LAB_TECH"));
}

#[tokio::test]
async fn jwks_is_public_and_matches_token_kid() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/.well-known/jwks.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let key = &body["keys"][0];
    assert_eq!(key["kty"], "RSA");
    assert_eq!(key["use"], "sig");
    assert_eq!(key["alg"], "RS256");

    let token = admin_token(&h.app).await;
    let header = jsonwebtoken::decode_header(&token).unwrap();
    assert_eq!(header.kid.as_deref(), key["kid"].as_str());
}

#[tokio::test]
async fn unknown_route_requires_authentication() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/nope", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Full authentication is required");
    assert_eq!(body["path"], "/nope");

    let admin = admin_token(&h.app).await;
    let (status, body) = call(&h.app, Method::GET, "/nope", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(body["path"], "/nope");
}

#[tokio::test]
async fn health_and_docs_are_public() {
    let h = harness();
    let (status, body) = call(&h.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["store"], "ok");

    let (status, doc) = call(&h.app, Method::GET, "/api-doc/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/auth/login"].is_object());
}

#[tokio::test]
async fn responses_carry_request_id() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
