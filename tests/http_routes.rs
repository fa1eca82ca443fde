//! Request routing over in-memory stores, without a socket

use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request, StatusCode};
use serde_json::{json, Value};

use ireporter::server::{route, AppState};
use ireporter::store::Stores;
use ireporter::{Args, Services};

fn state() -> AppState {
    let args = Args::parse_from(["ireporter", "--dev-mode", "--jwt-secret", ""]);
    let services = Services::new(Stores::memory(), args.jwt_validator().unwrap());
    AppState::new(args, services, None).unwrap()
}

async fn call(
    state: &AppState,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = body.map(|v| v.to_string()).unwrap_or_default();
    let req = builder.body(Full::new(Bytes::from(body))).unwrap();

    let resp = route(state, req).await;
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(state: &AppState, name: &str, email: &str) -> (String, String) {
    let (status, body) = call(
        state,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

fn incident_body() -> Value {
    json!({
        "title": "Ghost workers on payroll",
        "description": "Names of people who left years ago still draw salaries.",
        "type": "redflag",
        "category": "embezzlement",
        "location": "District office",
    })
}

#[tokio::test]
async fn health_and_banner() {
    let state = state();
    let (status, body) = call(&state, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["storage"], "memory");

    let (status, body) = call(&state, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["users"], 0);

    let (status, body) = call(&state, Method::GET, "/version", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["git_commit"].is_string());
}

#[tokio::test]
async fn preflight_and_unknown_paths() {
    let state = state();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/incidents")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let resp = route(&state, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let (status, body) = call(&state, Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/api/nowhere");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let state = state();
    for path in ["/api/incidents", "/api/users/me", "/api/notifications", "/api/admin/users"] {
        let (status, body) = call(&state, Method::GET, path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    let (status, _) = call(&state, Method::GET, "/api/users/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn incident_round_trip() {
    let state = state();
    let (admin, _) = register(&state, "Ada", "a@x.com").await;
    let (bee, bee_id) = register(&state, "Bee", "b@x.com").await;

    let (status, body) = call(
        &state,
        Method::POST,
        "/api/incidents",
        Some(&*bee),
        Some(incident_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Incident created successfully");
    let id = body["incident"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["incident"]["user_id"], bee_id.as_str());
    assert_eq!(body["incident"]["status"], "pending");
    assert_eq!(body["incident"]["type"], "redflag");

    let (status, list) = call(&state, Method::GET, "/api/incidents", Some(&*admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let path = format!("/api/incidents/{}/status", id);
    let (status, _) = call(
        &state,
        Method::PATCH,
        &path,
        Some(&*bee),
        Some(json!({ "status": "resolved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &state,
        Method::PATCH,
        &path,
        Some(&*admin),
        Some(json!({ "status": "closed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = call(
        &state,
        Method::PATCH,
        &path,
        Some(&*admin),
        Some(json!({ "status": "investigating" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["incident"]["status"], "investigating");

    let (status, inbox) = call(&state, Method::GET, "/api/notifications", Some(&*bee), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["unread_count"], 1);

    let (status, body) = call(
        &state,
        Method::PUT,
        "/api/notifications/read-all",
        Some(&*bee),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, stats) =
        call(&state, Method::GET, "/api/incidents/stats", Some(&*bee), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["investigating"], 1);

    let detail = format!("/api/incidents/{}", id);
    let (status, _) = call(&state, Method::DELETE, &detail, Some(&*bee), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&state, Method::GET, &detail, Some(&*bee), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Incident not found");
}

#[tokio::test]
async fn anonymous_report_and_login_linking() {
    let state = state();
    register(&state, "Ada", "a@x.com").await;

    let mut body = incident_body();
    body["reporter_email"] = json!("b@x.com");
    let (status, created) =
        call(&state, Method::POST, "/api/incidents/anonymous", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["incident"]["is_anonymous"], true);
    assert!(created["note"].is_string());

    let (status, body) = call(
        &state,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({ "name": "Bee", "email": "b@x.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["linked_incidents"], 1);
    assert_eq!(body["auto_login"], true);

    let (status, body) = call(
        &state,
        Method::POST,
        "/api/users/register",
        None,
        Some(json!({ "name": "Bee", "email": "b@x.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User already exists");

    let (status, body) = call(
        &state,
        Method::POST,
        "/api/users/login",
        None,
        Some(json!({ "email": "b@x.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["linked_incidents"], 0);
}

#[tokio::test]
async fn admin_role_management() {
    let state = state();
    let (admin, _) = register(&state, "Ada", "a@x.com").await;
    let (bee, bee_id) = register(&state, "Bee", "b@x.com").await;

    let (status, _) = call(&state, Method::GET, "/api/admin/users", Some(&*bee), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let path = format!("/api/admin/users/{}/role", bee_id);
    let (status, body) = call(
        &state,
        Method::PATCH,
        &path,
        Some(&*admin),
        Some(json!({ "role": "Admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User role updated to admin");
    assert_eq!(body["user"]["is_admin"], true);

    let (status, users) = call(&state, Method::GET, "/api/admin/users", Some(&*bee), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
}

#[tokio::test]
async fn empty_body_is_rejected() {
    let state = state();
    let (status, body) = call(&state, Method::POST, "/api/users/login", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");
}
