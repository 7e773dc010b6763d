//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the auth API and the session-aware pages under one Axum router. The
//! route guard runs as middleware ahead of every handler, so protected paths
//! redirect before a session manager is ever consulted.

pub mod auth;
pub mod guard;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/state", get(auth::state))
        .route("/api/auth/sign-in", post(auth::sign_in))
        .route("/api/auth/sign-up", post(auth::sign_up))
        .route("/api/auth/google", post(auth::google))
        .route("/api/auth/logout", post(auth::logout))
        .route("/login", get(pages::login_page))
        .route("/dashboard", get(pages::dashboard_page))
        .route("/dashboard/booking", get(pages::booking_page))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn(guard::require_session_marker))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
