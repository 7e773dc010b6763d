//! Session manager: one client's auth state and the operations that change it.
//!
//! DESIGN
//! ======
//! The manager exclusively owns `{user, loading, error}` in a
//! `watch::Sender`; consumers read snapshots or hold a receiver. A single
//! listener task consumes the provider's change stream in order and is the
//! only writer of `user` and `loading`. Operations write only `error`: a
//! successful sign-in does not touch `user`, the next notification does.
//!
//! STATE MACHINE
//! =============
//! `Initializing` (loading, no user) moves to `Authenticated` or `Anonymous`
//! on the first notification and never returns. Later notifications move
//! between the two settled states.
//!
//! TRADE-OFFS
//! ==========
//! In-flight operations are not cancelled; a dropped caller just discards
//! the result. The popup in-flight flag is released by a guard, so dropping
//! a pending Google sign-in still frees the slot. Sign-up is two or three
//! sequential remote calls; if a later one fails the account still exists.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{AuthError, AuthOperation, ErrorCode};
use crate::provider::{
    ChangeStream, Credential, FederatedProvider, IdentityProvider, ProfileDocument, ProfileStore, ProviderError,
    ProviderUser,
};
use crate::validate::{is_valid_email, meets_password_minimum};

// =============================================================================
// STATE
// =============================================================================

/// Signed-in user as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    #[serde(skip)]
    pub credential: Option<Credential>,
}

impl From<ProviderUser> for Session {
    fn from(user: ProviderUser) -> Self {
        Self {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            email_verified: user.email_verified,
            credential: user.credential,
        }
    }
}

/// Everything a consumer may read about one client's auth state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Session>,
    /// True until the first session notification; never reverts.
    pub loading: bool,
    /// Last failure of an auth operation; cleared when a new one starts.
    pub error: Option<AuthError>,
}

impl AuthState {
    #[must_use]
    pub fn initializing() -> Self {
        Self { user: None, loading: true, error: None }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.loading) {
            (_, true) => SessionPhase::Initializing,
            (Some(_), false) => SessionPhase::Authenticated,
            (None, false) => SessionPhase::Anonymous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Initializing,
    Authenticated,
    Anonymous,
}

// =============================================================================
// POPUP GUARD
// =============================================================================

/// Holds the single popup slot; releases it on drop.
struct PopupGuard<'a>(&'a AtomicBool);

impl<'a> PopupGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PopupGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// MANAGER
// =============================================================================

pub struct SessionManager {
    provider: Option<Arc<dyn IdentityProvider>>,
    profiles: Option<Arc<dyn ProfileStore>>,
    google: Option<FederatedProvider>,
    state: Arc<watch::Sender<AuthState>>,
    popup_in_flight: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self::build(Some(provider))
    }

    /// Manager whose provider failed to initialize; every operation reports `Uninitialized`.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::build(None)
    }

    fn build(provider: Option<Arc<dyn IdentityProvider>>) -> Self {
        let (state, _) = watch::channel(AuthState::initializing());
        Self {
            provider,
            profiles: None,
            google: None,
            state: Arc::new(state),
            popup_in_flight: AtomicBool::new(false),
            listener: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    #[must_use]
    pub fn with_federated(mut self, provider: FederatedProvider) -> Self {
        self.google = Some(provider);
        self
    }

    // -------------------------------------------------------------------------
    // consumers
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    /// Wait until loading resolves. Returns `false` on timeout.
    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        tokio::time::timeout(timeout, async move { rx.wait_for(|s| !s.loading).await.is_ok() })
            .await
            .unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // subscription
    // -------------------------------------------------------------------------

    /// Subscribe to the provider's change stream, replacing any existing subscription.
    ///
    /// If the provider is missing or the subscription fails, loading resolves
    /// to `false` with no user so pages stop waiting.
    pub async fn start(&self) {
        self.stop();

        let Some(provider) = &self.provider else {
            warn!("identity provider not initialized; session resolves as signed out");
            self.resolve_without_session();
            return;
        };

        let stream = match provider.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "session subscription failed");
                self.resolve_without_session();
                return;
            }
        };

        let handle = tokio::spawn(run_listener(stream, Arc::clone(&self.state), self.profiles.clone()));
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Cancel the active subscription, if any.
    pub fn stop(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn resolve_without_session(&self) {
        self.state.send_modify(|s| {
            s.user = None;
            s.loading = false;
        });
    }

    // -------------------------------------------------------------------------
    // operations
    // -------------------------------------------------------------------------

    /// Password sign-in. State changes arrive through the next notification.
    ///
    /// # Errors
    ///
    /// Returns the classified failure, which is also stored as the shared error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let op = AuthOperation::SignIn;
        let provider = self.begin(op)?;
        if !is_valid_email(email) {
            return Err(self.fail(op, AuthError::InvalidEmailFormat));
        }
        if !meets_password_minimum(password) {
            return Err(self.fail(op, AuthError::InvalidCredentials));
        }

        provider
            .sign_in_with_password(email.trim(), password)
            .await
            .map(|user| debug!(uid = %user.uid, "password sign-in accepted"))
            .map_err(|e| self.fail_provider(op, &e))
    }

    /// Create a password account, then set its display name and profile document.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the first call that fails.
    pub async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<(), AuthError> {
        let op = AuthOperation::SignUp;
        let provider = self.begin(op)?;
        if !is_valid_email(email) {
            return Err(self.fail(op, AuthError::InvalidEmailFormat));
        }
        if !meets_password_minimum(password) {
            return Err(self.fail(op, AuthError::WeakPassword));
        }

        let user = provider
            .create_user(email.trim(), password)
            .await
            .map_err(|e| self.fail_provider(op, &e))?;
        info!(uid = %user.uid, "account created");

        // The account exists from here on even if the follow-ups fail.
        provider
            .update_profile(&user, display_name)
            .await
            .map_err(|e| self.fail_provider(op, &e))?;

        if let Some(profiles) = &self.profiles {
            let doc = ProfileDocument::new(display_name, user.email.as_deref());
            profiles
                .write_profile(&user, &doc)
                .await
                .map_err(|e| self.fail_provider(op, &e))?;
        }
        Ok(())
    }

    /// Federated sign-in through the provider's popup. One popup at a time.
    ///
    /// # Errors
    ///
    /// Returns `DuplicatePopupRequest` without calling the provider while
    /// another popup is in flight, otherwise the classified provider failure.
    pub async fn sign_in_with_google(&self) -> Result<(), AuthError> {
        let op = AuthOperation::GoogleSignIn;
        let provider = self.begin(op)?;
        let Some(google) = &self.google else {
            return Err(self.fail(op, AuthError::google_uninitialized()));
        };
        let Some(_slot) = PopupGuard::acquire(&self.popup_in_flight) else {
            return Err(self.fail(op, AuthError::DuplicatePopupRequest));
        };

        provider
            .sign_in_with_popup(google)
            .await
            .map(|user| debug!(uid = %user.uid, "federated sign-in accepted"))
            .map_err(|e| self.fail_provider(op, &e))
    }

    /// Sign out. Always reaches the provider, even with no session.
    ///
    /// # Errors
    ///
    /// Returns `Uninitialized` if the provider never initialized, or the
    /// provider's sign-out failure.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let op = AuthOperation::Logout;
        let provider = self.begin(op)?;
        provider.sign_out().await.map_err(|e| self.fail_provider(op, &e))
    }

    /// Clear the shared error and hand back the provider, or fail with `Uninitialized`.
    fn begin(&self, op: AuthOperation) -> Result<Arc<dyn IdentityProvider>, AuthError> {
        self.state.send_if_modified(|s| s.error.take().is_some());
        match &self.provider {
            Some(provider) => Ok(Arc::clone(provider)),
            None => Err(self.fail(op, AuthError::uninitialized())),
        }
    }

    fn fail_provider(&self, op: AuthOperation, e: &ProviderError) -> AuthError {
        debug!(op = op.as_str(), provider_code = %e.code, "provider call failed");
        self.fail(op, AuthError::classify(op, e))
    }

    fn fail(&self, op: AuthOperation, err: AuthError) -> AuthError {
        if matches!(err, AuthError::ProviderMisconfigured) {
            error!(op = op.as_str(), "federated sign-in is not enabled for this identity project; operator action required");
        } else {
            warn!(op = op.as_str(), code = err.error_code(), error = %err, "auth operation failed");
        }
        let stored = err.clone();
        self.state.send_modify(|s| s.error = Some(stored));
        err
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// LISTENER
// =============================================================================

async fn run_listener(
    mut stream: ChangeStream,
    state: Arc<watch::Sender<AuthState>>,
    profiles: Option<Arc<dyn ProfileStore>>,
) {
    while let Some(next) = stream.recv().await {
        let session = match next {
            Some(user) if !user.uid.trim().is_empty() => Some(resolve_session(user, profiles.as_deref()).await),
            Some(_) => {
                warn!("notification carried a user without an identifier; treating as signed out");
                None
            }
            None => None,
        };
        state.send_modify(|s| {
            s.user = session;
            s.loading = false;
        });
    }

    debug!("session change stream closed");
    state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
}

/// Fill a missing display name from the user's profile document.
async fn resolve_session(user: ProviderUser, profiles: Option<&dyn ProfileStore>) -> Session {
    let mut display_name = user.display_name.clone();
    if let (None, Some(profiles)) = (&display_name, profiles) {
        match profiles.read_profile(&user).await {
            Ok(Some(doc)) if !doc.name.trim().is_empty() => display_name = Some(doc.name),
            Ok(_) => {}
            Err(e) => warn!(uid = %user.uid, error = %e, "profile lookup failed; keeping identity without name"),
        }
    }
    Session { display_name, ..Session::from(user) }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
