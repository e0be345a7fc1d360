use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use rookery_shared::types::auth::JwtKeys;
use rookery_social::models::UpdateUser;
use rookery_social::store::Store;
use rookery_social::{build_router, AppState};

fn app() -> Router {
    app_with_state().0
}

fn app_with_state() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Store::memory()));
    let router = build_router(state.clone(), JwtKeys::new("integration-secret", 3600));
    (router, state)
}

/// Change a stored role directly, leaving already issued tokens untouched.
fn store_role(state: &AppState, id: &str, role: &str) {
    let id = Uuid::parse_str(id).unwrap();
    let changes = UpdateUser { role: Some(role.to_string()), ..Default::default() };
    state.store.transaction(|repo| repo.update_user(id, &changes)).unwrap();
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Registers `username` and returns `(user id, token)`.
async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/accounts/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter2hunter2",
            "password2": "hunter2hunter2",
            "first_name": "Test",
            "last_name": "User",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let id = body["data"]["user"]["id"].as_str().unwrap().to_string();
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (id, token)
}

#[tokio::test]
async fn follow_post_like_flow() {
    let app = app();
    let (alice_id, alice) = register(&app, "alice").await;
    let (bob_id, bob) = register(&app, "bob").await;

    let (status, body) = call(&app, Method::POST, &format!("/users/{bob_id}/follow"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["following"], json!(true));
    assert_eq!(body["data"]["created"], json!(true));

    let (status, body) = call(
        &app,
        Method::POST,
        "/posts",
        Some(&bob),
        Some(json!({ "title": "Hello", "content": "first post" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, Method::GET, "/feed", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["id"], json!(post_id));

    let (status, body) = call(&app, Method::POST, &format!("/posts/{post_id}/like"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_liked"], json!(true));
    assert_eq!(body["data"]["likes_count"], json!(1));

    let (status, body) = call(&app, Method::GET, "/notifications?unread=true", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let verbs: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["verb"].as_str().unwrap())
        .collect();
    assert_eq!(verbs, vec!["like", "follow"]);
    let like = &body["data"]["items"][0];
    assert_eq!(like["actor"]["id"], json!(alice_id));
    assert_eq!(like["target"]["id"], json!(post_id));

    let (_, body) = call(&app, Method::GET, "/notifications/unread-count", Some(&bob), None).await;
    assert_eq!(body["data"]["count"], json!(2));

    // Alice cannot mark Bob's notification as read.
    let notification_id = like["id"].as_str().unwrap();
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/notifications/{notification_id}/mark-read"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/notifications/{notification_id}/mark-read"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_read"], json!(true));

    let (_, body) = call(&app, Method::GET, "/notifications/unread-count", Some(&bob), None).await;
    assert_eq!(body["data"]["count"], json!(1));
}

#[tokio::test]
async fn writes_require_a_token() {
    let app = app();

    let (status, body) = call(&app, Method::POST, "/posts", None, Some(json!({ "title": "t", "content": "c" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, _) = call(&app, Method::GET, "/feed", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads stay public.
    let (status, body) = call(&app, Method::GET, "/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(0));
}

#[tokio::test]
async fn cannot_follow_self() {
    let app = app();
    let (id, token) = register(&app, "carol").await;

    let (status, body) = call(&app, Method::POST, &format!("/users/{id}/follow"), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("E2001"));
}

#[tokio::test]
async fn only_the_author_edits_a_post() {
    let app = app();
    let (_, dave) = register(&app, "dave").await;
    let (_, erin) = register(&app, "erin").await;

    let (_, body) = call(
        &app,
        Method::POST,
        "/posts",
        Some(&dave),
        Some(json!({ "title": "Mine", "content": "hands off" })),
    )
    .await;
    let post_uri = format!("/posts/{}", body["data"]["id"].as_str().unwrap());

    let (status, _) = call(&app, Method::PATCH, &post_uri, Some(&erin), Some(json!({ "title": "Ours" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, &post_uri, Some(&erin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, &post_uri, Some(&dave), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, &post_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn token_of_a_deleted_account_is_rejected() {
    let app = app();
    let (_, frank) = register(&app, "frank").await;
    let (grace_id, _) = register(&app, "grace").await;

    let (status, _) = call(&app, Method::DELETE, "/accounts/profile", Some(&frank), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::POST, &format!("/users/{grace_id}/follow"), Some(&frank), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], json!("E0004"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/posts",
        Some(&frank),
        Some(json!({ "title": "ghost", "content": "from beyond" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A stale token is refused on public reads too, rather than read as anonymous.
    let (status, _) = call(&app, Method::GET, "/posts", Some(&frank), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_checks_use_the_stored_role() {
    let (app, state) = app_with_state();
    let (root_id, root) = register(&app, "root").await;
    let (ivy_id, _) = register(&app, "ivy").await;
    let role_uri = format!("/users/{ivy_id}/role");

    let (status, _) = call(&app, Method::PUT, &role_uri, Some(&root), Some(json!({ "role": "moderator" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Promotion applies to the token issued while root was a member.
    store_role(&state, &root_id, "admin");
    let (status, body) = call(&app, Method::PUT, &role_uri, Some(&root), Some(json!({ "role": "moderator" }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["role"], json!("moderator"));

    store_role(&state, &root_id, "member");
    let (status, _) = call(&app, Method::PUT, &role_uri, Some(&root), Some(json!({ "role": "member" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_reports_the_store() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["checks"][0]["name"], json!("memory"));
}
