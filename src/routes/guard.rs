//! Route guard for protected paths.
//!
//! LIMITS
//! ======
//! This is a UX convenience, not a security control. It checks only whether
//! a cookie named `session` is present; the value is never inspected or
//! verified, so anyone can set the cookie and pass. Protected pages still
//! decide what to render from the session manager's state.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::services::pages::LOGIN_PATH;

/// Name of the coarse session marker cookie.
pub const SESSION_MARKER: &str = "session";

/// This path and every path below it are guarded.
pub const PROTECTED_PREFIX: &str = "/dashboard";

fn is_protected(path: &str) -> bool {
    path.strip_prefix(PROTECTED_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[must_use]
pub fn should_redirect(path: &str, has_marker: bool) -> bool {
    !has_marker && is_protected(path)
}

/// Redirect guarded requests without a session marker to the login page.
pub async fn require_session_marker(jar: CookieJar, request: Request, next: Next) -> Response {
    let has_marker = jar.get(SESSION_MARKER).is_some();
    if should_redirect(request.uri().path(), has_marker) {
        tracing::debug!(path = %request.uri().path(), "no session marker; redirecting to login");
        return Redirect::temporary(LOGIN_PATH).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
