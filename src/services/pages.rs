//! Render decisions for the pages that read session state.

use serde::Serialize;

use crate::services::session::{AuthState, Session};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// `true` once loading has resolved with no user.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}

/// What a protected page should do for the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PageDecision<T> {
    /// Session not resolved yet; show a loading indicator.
    Loading,
    RedirectTo { location: &'static str },
    Render { content: T },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub greeting: String,
    pub email: Option<String>,
}

/// Contact fields prefilled into the booking form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingPrefill {
    pub name: String,
    pub email: String,
}

fn protected<T>(state: &AuthState, render: impl FnOnce(&Session) -> T) -> PageDecision<T> {
    if state.loading {
        return PageDecision::Loading;
    }
    match &state.user {
        Some(user) => PageDecision::Render { content: render(user) },
        None => PageDecision::RedirectTo { location: LOGIN_PATH },
    }
}

#[must_use]
pub fn dashboard(state: &AuthState) -> PageDecision<DashboardView> {
    protected(state, |user| DashboardView {
        greeting: format!("Welcome, {}!", user.display_name.as_deref().filter(|n| !n.is_empty()).unwrap_or("User")),
        email: user.email.clone(),
    })
}

#[must_use]
pub fn booking(state: &AuthState) -> PageDecision<BookingPrefill> {
    protected(state, |user| BookingPrefill {
        name: user.display_name.clone().unwrap_or_default(),
        email: user.email.clone().unwrap_or_default(),
    })
}

/// The login page sends signed-in users to the dashboard.
#[must_use]
pub fn login(state: &AuthState) -> PageDecision<()> {
    if state.loading {
        return PageDecision::Loading;
    }
    match state.user {
        Some(_) => PageDecision::RedirectTo { location: DASHBOARD_PATH },
        None => PageDecision::Render { content: () },
    }
}

/// Label shown in the navigation bar: display name, else email.
#[must_use]
pub fn nav_identity(state: &AuthState) -> Option<String> {
    let user = state.user.as_ref()?;
    user.display_name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| user.email.clone())
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
