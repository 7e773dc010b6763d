//! Provider-neutral identity types shared by every backend.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Machine-readable failure codes reported by identity providers.
pub mod codes {
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    pub const INVALID_EMAIL: &str = "auth/invalid-email";
    pub const TOO_MANY_REQUESTS: &str = "auth/too-many-requests";
    pub const EMAIL_ALREADY_IN_USE: &str = "auth/email-already-in-use";
    pub const WEAK_PASSWORD: &str = "auth/weak-password";
    pub const USER_DISABLED: &str = "auth/user-disabled";
    pub const INVALID_USER_TOKEN: &str = "auth/invalid-user-token";
    pub const USER_TOKEN_EXPIRED: &str = "auth/user-token-expired";
    pub const POPUP_CLOSED_BY_USER: &str = "auth/popup-closed-by-user";
    pub const POPUP_BLOCKED: &str = "auth/popup-blocked";
    pub const CANCELLED_POPUP_REQUEST: &str = "auth/cancelled-popup-request";
    pub const CONFIGURATION_NOT_FOUND: &str = "auth/configuration-not-found";
    pub const OPERATION_NOT_ALLOWED: &str = "auth/operation-not-allowed";
    pub const OPERATION_NOT_SUPPORTED: &str = "auth/operation-not-supported-in-this-environment";
    pub const NETWORK_REQUEST_FAILED: &str = "auth/network-request-failed";
    pub const INTERNAL_ERROR: &str = "auth/internal-error";
    pub const PERMISSION_DENIED: &str = "permission-denied";
}

/// Structured failure returned by any provider primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Machine-readable code, one of [`codes`] for known failures.
    pub code: String,
    /// Provider-supplied human-readable detail. May be empty.
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }

    /// Failure from a transport problem (connect, timeout, unreadable body).
    ///
    /// The detail can carry request URLs, so it is logged rather than kept.
    pub fn network(detail: impl fmt::Display) -> Self {
        tracing::warn!(error = %detail, "identity request failed in transport");
        Self::new(codes::NETWORK_REQUEST_FAILED, "")
    }

    /// Response the client could not interpret. The detail is logged only.
    pub fn unexpected(detail: impl fmt::Display) -> Self {
        tracing::warn!(error = %detail, "unexpected provider response");
        Self::new(codes::INTERNAL_ERROR, "")
    }
}

// =============================================================================
// USER
// =============================================================================

/// Opaque credential issued by the provider for a signed-in user.
///
/// Never serialized; `Debug` redacts the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// User record delivered by the provider's change notification and sign-in calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub credential: Option<Credential>,
}

impl ProviderUser {
    /// Minimal user with only an identifier and email, as delivered by a fresh sign-up.
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self { uid: uid.into(), email, display_name: None, email_verified: false, credential: None }
    }
}

// =============================================================================
// FEDERATED PROVIDER
// =============================================================================

/// Federated identity provider requested for popup sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProvider {
    pub provider_id: String,
    pub scopes: Vec<String>,
}

impl FederatedProvider {
    #[must_use]
    pub fn google() -> Self {
        Self { provider_id: "google.com".into(), scopes: vec!["email".into(), "profile".into()] }
    }
}

// =============================================================================
// PROFILE DOCUMENT
// =============================================================================

/// Supplementary profile fields stored under `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    pub name: String,
    pub email: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl ProfileDocument {
    /// New document stamped with the current UTC time.
    #[must_use]
    pub fn new(name: &str, email: Option<&str>) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self { name: name.to_owned(), email: email.map(str::to_owned), created_at }
    }
}
