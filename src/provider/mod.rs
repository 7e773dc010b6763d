//! Identity provider seam: auth primitives, change stream and profile documents.
//!
//! DESIGN
//! ======
//! The session manager depends only on the traits below; concrete backends are
//! injected at construction. `IdentityBackend` hands out one independent
//! `IdentityProvider` per client, because a provider instance carries its own
//! "current user" the way a browser SDK instance does.
//!
//! - `memory`: in-process directory for development and tests.
//! - `identity_toolkit`: hosted identity REST API.
//! - `firestore`: hosted document store for `users/{uid}` profiles.

pub mod firestore;
pub mod identity_toolkit;
pub mod memory;
mod notifier;
pub mod types;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use types::{Credential, FederatedProvider, ProfileDocument, ProviderError, ProviderUser, codes};

/// Stream of session-change notifications. `None` means "no session".
pub type ChangeStream = mpsc::UnboundedReceiver<Option<ProviderUser>>;

/// Authentication primitives of one provider instance.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register for session-change notifications.
    ///
    /// The current value is delivered at least once, asynchronously. Dropping
    /// the returned stream ends the subscription.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the subscription cannot be established.
    async fn subscribe(&self) -> Result<ChangeStream, ProviderError>;

    /// Verify an email/password pair and make that user current.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] with a machine-readable code on failure.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError>;

    /// Create a password account and make it current.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] with a machine-readable code on failure.
    async fn create_user(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError>;

    /// Set the display name on an existing account.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the account cannot be updated.
    async fn update_profile(&self, user: &ProviderUser, display_name: &str) -> Result<(), ProviderError>;

    /// Run a federated sign-in through the provider's popup flow.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] with a popup or configuration code on failure.
    async fn sign_in_with_popup(&self, provider: &FederatedProvider) -> Result<ProviderUser, ProviderError>;

    /// Drop the current session.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the provider rejects the sign-out.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// Per-user document storage keyed by user identifier.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the profile document for `user`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the store cannot be reached.
    async fn read_profile(&self, user: &ProviderUser) -> Result<Option<ProfileDocument>, ProviderError>;

    /// Create or replace the profile document for `user`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the write is rejected.
    async fn write_profile(&self, user: &ProviderUser, doc: &ProfileDocument) -> Result<(), ProviderError>;
}

/// Source of per-client provider instances sharing one account backend.
pub trait IdentityBackend: Send + Sync {
    /// Open a fresh provider instance with no current user.
    fn connect(&self) -> Arc<dyn IdentityProvider>;

    /// Profile document store backing this identity backend, if any.
    fn profiles(&self) -> Option<Arc<dyn ProfileStore>>;
}
