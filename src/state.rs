//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the client registry (one session manager per browser client) and
//! the cookie and readiness settings the HTTP layer applies.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::services::registry::ClientRegistry;

/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
    /// Set the `Secure` attribute on cookies.
    pub cookie_secure: bool,
    /// How long a request waits for a new client's first session notification.
    pub ready_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(registry: Arc<ClientRegistry>, config: &AppConfig) -> Self {
        Self { registry, cookie_secure: config.cookie_secure, ready_timeout: config.session_ready_timeout }
    }
}
