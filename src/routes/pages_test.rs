use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::provider::IdentityBackend;
use crate::provider::memory::MemoryDirectory;
use crate::services::registry::ClientRegistry;
use crate::state::AppState;

fn app() -> (Router, Arc<ClientRegistry>) {
    let backend: Arc<dyn IdentityBackend> = Arc::new(MemoryDirectory::new());
    let registry = Arc::new(ClientRegistry::new(Some(backend), false));
    let config = AppConfig::from_lookup(|_| None).unwrap();
    (crate::routes::app(AppState::new(Arc::clone(&registry), &config)), registry)
}

async fn get(app: &Router, uri: &str, cookie: &str) -> axum::response::Response {
    let request = Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn signed_up(app: &Router, registry: &ClientRegistry, client: &str, name: &str) {
    let body = json!({
        "name": name,
        "email": "sam@example.com",
        "password": "secret123",
        "confirm_password": "secret123",
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/sign-up")
        .header(header::COOKIE, format!("mentor_client={client}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let mut rx = registry.manager(client).await.watch();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.user.as_ref().is_some_and(|u| u.display_name.is_some())))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn login_page_renders_for_anonymous_client() {
    let (app, _) = app();
    let response = get(&app, "/login", "mentor_client=abc").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "view": "render", "content": null }));
}

#[tokio::test]
async fn login_page_sends_signed_in_client_to_dashboard() {
    let (app, registry) = app();
    signed_up(&app, &registry, "abc", "Sam").await;

    let response = get(&app, "/login", "mentor_client=abc").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/dashboard");
}

#[tokio::test]
async fn dashboard_greets_signed_in_user() {
    let (app, registry) = app();
    signed_up(&app, &registry, "abc", "Sam").await;

    let response = get(&app, "/dashboard", "mentor_client=abc; session=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["view"], "render");
    assert_eq!(body["content"]["greeting"], "Welcome, Sam!");
    assert_eq!(body["content"]["email"], "sam@example.com");
}

#[tokio::test]
async fn forged_marker_passes_guard_but_page_redirects() {
    let (app, _) = app();
    let response = get(&app, "/dashboard", "mentor_client=abc; session=forged").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/login");
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|c| c.starts_with("session=;") && c.contains("Max-Age=0"));
    assert!(cleared);
}

#[tokio::test]
async fn booking_is_prefilled_from_session() {
    let (app, registry) = app();
    signed_up(&app, &registry, "abc", "Sam").await;

    let body = json_body(get(&app, "/dashboard/booking", "mentor_client=abc; session=1").await).await;
    assert_eq!(body["content"], json!({ "name": "Sam", "email": "sam@example.com" }));
}

#[tokio::test]
async fn guard_runs_before_pages() {
    let (app, registry) = app();
    let response = get(&app, "/dashboard/booking", "mentor_client=abc").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/login");
    // Redirected before the extractor ran, so no manager was created.
    assert_eq!(registry.client_count().await, 0);
}

#[tokio::test]
async fn healthz_is_ok() {
    let (app, _) = app();
    let response = get(&app, "/healthz", "").await;
    assert_eq!(response.status(), StatusCode::OK);
}
