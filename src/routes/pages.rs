//! Session-aware pages: login, dashboard and booking.
//!
//! Each page answers with its render decision as JSON. A redirect decision
//! becomes a 307 to the target, carrying the synced marker cookie so the
//! guard and the session state agree on the next request.

use axum::response::{IntoResponse, Json, Redirect, Response};
use serde::Serialize;

use crate::routes::auth::ClientSession;
use crate::services::pages::{self, PageDecision};

fn render<T: Serialize>(client: &ClientSession, decision: PageDecision<T>) -> Response {
    let jar = client.synced_jar();
    match decision {
        PageDecision::RedirectTo { location } => (jar, Redirect::temporary(location)).into_response(),
        other => (jar, Json(other)).into_response(),
    }
}

/// `GET /login`
pub async fn login_page(client: ClientSession) -> Response {
    render(&client, pages::login(&client.manager.snapshot()))
}

/// `GET /dashboard`
pub async fn dashboard_page(client: ClientSession) -> Response {
    render(&client, pages::dashboard(&client.manager.snapshot()))
}

/// `GET /dashboard/booking`: contact fields prefilled from the session.
pub async fn booking_page(client: ClientSession) -> Response {
    render(&client, pages::booking(&client.manager.snapshot()))
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
