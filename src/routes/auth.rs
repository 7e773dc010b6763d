//! Auth routes: session state, sign-in, sign-up, Google sign-in, logout.
//!
//! DESIGN
//! ======
//! Every request resolves its browser client through the `mentor_client`
//! cookie (issued on first contact) to that client's session manager. These
//! handlers also maintain the `session` marker cookie read by the route
//! guard: set when an operation that establishes a session succeeds or a
//! state read sees a signed-in user, cleared on logout or when a read sees
//! none.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use time::Duration;

use crate::error::{AuthError, ErrorCode};
use crate::routes::guard::SESSION_MARKER;
use crate::services::forms::{self, FormStatus, LoginForm, RegistrationForm, SubmitError};
use crate::services::pages::nav_identity;
use crate::services::session::{AuthState, Session, SessionManager, SessionPhase};
use crate::state::AppState;
use crate::token::generate_token;

/// Opaque per-browser identifier that selects the session manager.
pub const CLIENT_COOKIE_NAME: &str = "mentor_client";

const MARKER_VALUE: &str = "1";

// =============================================================================
// CLIENT EXTRACTOR
// =============================================================================

/// The requesting browser client's session manager.
///
/// Issues a client cookie when the request has none. Handlers must return
/// `jar` so a newly issued cookie reaches the browser.
pub struct ClientSession {
    pub manager: Arc<SessionManager>,
    pub jar: CookieJar,
    secure: bool,
}

impl<S> axum::extract::FromRequestParts<S> for ClientSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let secure = app_state.cookie_secure;
        let mut jar = CookieJar::from_headers(&parts.headers);

        let existing = jar
            .get(CLIENT_COOKIE_NAME)
            .map(Cookie::value)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let client_id = match existing {
            Some(id) => id,
            None => {
                let id = generate_token();
                jar = jar.add(client_cookie(id.clone(), secure));
                id
            }
        };

        let manager = app_state.registry.manager(&client_id).await;
        if !manager.wait_until_ready(app_state.ready_timeout).await {
            tracing::debug!("session still initializing after ready timeout");
        }
        Ok(Self { manager, jar, secure })
    }
}

impl ClientSession {
    /// Jar with the marker set or cleared to match the current phase.
    #[must_use]
    pub fn synced_jar(&self) -> CookieJar {
        match self.manager.phase() {
            SessionPhase::Authenticated => set_marker(self.jar.clone(), self.secure),
            SessionPhase::Anonymous if self.jar.get(SESSION_MARKER).is_some() => {
                clear_marker(self.jar.clone(), self.secure)
            }
            SessionPhase::Anonymous | SessionPhase::Initializing => self.jar.clone(),
        }
    }
}

fn client_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CLIENT_COOKIE_NAME, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub(crate) fn set_marker(jar: CookieJar, secure: bool) -> CookieJar {
    let cookie = Cookie::build((SESSION_MARKER, MARKER_VALUE))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure);
    jar.add(cookie)
}

pub(crate) fn clear_marker(jar: CookieJar, secure: bool) -> CookieJar {
    let cookie = Cookie::build((SESSION_MARKER, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO);
    jar.add(cookie)
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ErrorBody {
    fn from_error<E: ErrorCode>(err: &E) -> Self {
        Self { code: err.error_code(), message: err.to_string(), retryable: err.retryable() }
    }
}

pub(crate) fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Uninitialized { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::InvalidEmailFormat | AuthError::WeakPassword => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::EmailAlreadyInUse | AuthError::DuplicatePopupRequest => StatusCode::CONFLICT,
        AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        AuthError::PopupClosed | AuthError::PopupBlocked => StatusCode::BAD_REQUEST,
        AuthError::ProviderMisconfigured => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::GenericFailure { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(jar: CookieJar, err: &SubmitError) -> Response {
    let (status, body) = match err {
        SubmitError::Form(e) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorBody::from_error(e)),
        SubmitError::Auth(e) => (auth_status(e), ErrorBody::from_error(e)),
    };
    (status, jar, Json(body)).into_response()
}

/// Marker set on success; the error body otherwise, with the jar either way.
fn establishing_outcome(client: &ClientSession, result: Result<(), SubmitError>) -> Response {
    match result {
        Ok(()) => (set_marker(client.jar.clone(), client.secure), StatusCode::NO_CONTENT).into_response(),
        Err(e) => error_response(client.jar.clone(), &e),
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct StateView {
    pub phase: SessionPhase,
    pub user: Option<Session>,
    pub loading: bool,
    pub error: Option<ErrorBody>,
    /// Label for the navigation bar: display name, else email.
    pub nav_label: Option<String>,
}

impl From<&AuthState> for StateView {
    fn from(state: &AuthState) -> Self {
        Self {
            phase: state.phase(),
            user: state.user.clone(),
            loading: state.loading,
            error: state.error.as_ref().map(ErrorBody::from_error),
            nav_label: nav_identity(state),
        }
    }
}

/// `GET /api/auth/state`: current `{phase, user, loading, error}`; syncs the marker.
pub async fn state(client: ClientSession) -> Response {
    let view = StateView::from(&client.manager.snapshot());
    (client.synced_jar(), Json(view)).into_response()
}

/// `POST /api/auth/sign-in`: `{email, password}`.
pub async fn sign_in(client: ClientSession, Json(form): Json<LoginForm>) -> Response {
    let result = form.submit(&client.manager, &mut FormStatus::default()).await;
    establishing_outcome(&client, result)
}

/// `POST /api/auth/sign-up`: registration form; pre-checked before any remote call.
pub async fn sign_up(client: ClientSession, Json(form): Json<RegistrationForm>) -> Response {
    let result = form.submit(&client.manager, &mut FormStatus::default()).await;
    establishing_outcome(&client, result)
}

/// `POST /api/auth/google`: federated sign-in through the provider popup.
pub async fn google(client: ClientSession) -> Response {
    let result = forms::submit_google(&client.manager, &mut FormStatus::default()).await;
    establishing_outcome(&client, result)
}

/// `POST /api/auth/logout`: sign out and clear the marker.
pub async fn logout(client: ClientSession) -> Response {
    match client.manager.logout().await {
        Ok(()) => (clear_marker(client.jar.clone(), client.secure), StatusCode::NO_CONTENT).into_response(),
        Err(e) => error_response(client.jar.clone(), &SubmitError::Auth(e)),
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
