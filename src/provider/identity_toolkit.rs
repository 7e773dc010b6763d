//! Hosted identity REST backend.
//!
//! DESIGN
//! ======
//! Thin client over the identity REST API (`accounts:signInWithPassword`,
//! `accounts:signUp`, `accounts:update`). REST error messages such as
//! `EMAIL_EXISTS` are mapped onto the provider codes the session manager
//! classifies. Each connected client keeps its own current user; sign-out is
//! local because the REST API has no server-side sign-out.
//!
//! LIMITS
//! ======
//! Popup sign-in needs a browser; this backend reports
//! `auth/operation-not-supported-in-this-environment` for it. A rejected ID
//! token during a profile update drops the current session, which is how an
//! out-of-band revocation surfaces here.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::firestore::FirestoreProfiles;
use super::notifier::Notifier;
use super::{
    ChangeStream, Credential, FederatedProvider, IdentityBackend, IdentityProvider, ProfileStore, ProviderError,
    ProviderUser, codes,
};
use crate::config::{ConfigError, ProviderTimeouts};

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

// =============================================================================
// CLIENT
// =============================================================================

/// Shared HTTP client for the identity REST API.
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl IdentityToolkitClient {
    /// Build a client for `base_url` authenticated by `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(api_key: String, base_url: &str, timeouts: ProviderTimeouts) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    async fn call<B: Serialize + Sync>(&self, endpoint: &str, body: &B) -> Result<AccountResponse, ProviderError> {
        let url = format!("{}/accounts:{endpoint}", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(ProviderError::network)?;

        let status = response.status();
        let text = response.text().await.map_err(ProviderError::network)?;
        if !status.is_success() {
            tracing::debug!(endpoint, status = status.as_u16(), "identity api rejected request");
            return Err(map_rest_error(&text));
        }

        serde_json::from_str(&text)
            .map_err(ProviderError::unexpected)
    }
}

// =============================================================================
// BACKEND
// =============================================================================

/// Identity REST backend with an optional document store for profiles.
pub struct IdentityToolkitBackend {
    client: Arc<IdentityToolkitClient>,
    profiles: Option<Arc<FirestoreProfiles>>,
}

impl IdentityToolkitBackend {
    #[must_use]
    pub fn new(client: IdentityToolkitClient, profiles: Option<FirestoreProfiles>) -> Self {
        Self { client: Arc::new(client), profiles: profiles.map(Arc::new) }
    }
}

impl IdentityBackend for IdentityToolkitBackend {
    fn connect(&self) -> Arc<dyn IdentityProvider> {
        Arc::new(IdentityToolkitProvider::new(Arc::clone(&self.client)))
    }

    fn profiles(&self) -> Option<Arc<dyn ProfileStore>> {
        self.profiles
            .as_ref()
            .map(|p| Arc::clone(p) as Arc<dyn ProfileStore>)
    }
}

// =============================================================================
// PROVIDER INSTANCE
// =============================================================================

/// One client's session against the identity REST API.
pub struct IdentityToolkitProvider {
    client: Arc<IdentityToolkitClient>,
    session: Mutex<Notifier>,
}

impl IdentityToolkitProvider {
    #[must_use]
    pub fn new(client: Arc<IdentityToolkitClient>) -> Self {
        Self { client, session: Mutex::new(Notifier::default()) }
    }

    fn session(&self) -> MutexGuard<'_, Notifier> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn password_call(&self, endpoint: &str, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        let body = PasswordRequest { email: email.trim(), password, return_secure_token: true };
        let user = self.client.call(endpoint, &body).await?.into_user();
        self.session().publish(Some(user.clone()));
        Ok(user)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn subscribe(&self) -> Result<ChangeStream, ProviderError> {
        Ok(self.session().subscribe())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        self.password_call("signUp", email, password).await
    }

    async fn update_profile(&self, user: &ProviderUser, display_name: &str) -> Result<(), ProviderError> {
        let Some(credential) = &user.credential else {
            return Err(ProviderError::new(codes::INVALID_USER_TOKEN, "user has no credential"));
        };
        let body = UpdateRequest { id_token: credential.expose(), display_name, return_secure_token: true };

        match self.client.call("update", &body).await {
            Ok(resp) => {
                let mut updated = resp.into_user();
                if updated.credential.is_none() {
                    updated.credential = user.credential.clone();
                }
                let mut session = self.session();
                if session.current().is_some_and(|u| u.uid == updated.uid) {
                    session.publish(Some(updated));
                }
                Ok(())
            }
            Err(err) => {
                if is_session_invalidating(&err.code) {
                    tracing::warn!(uid = %user.uid, code = %err.code, "identity api rejected credential; dropping session");
                    let mut session = self.session();
                    if session.current().is_some_and(|u| u.uid == user.uid) {
                        session.publish(None);
                    }
                }
                Err(err)
            }
        }
    }

    async fn sign_in_with_popup(&self, provider: &FederatedProvider) -> Result<ProviderUser, ProviderError> {
        Err(ProviderError::new(
            codes::OPERATION_NOT_SUPPORTED,
            format!("popup sign-in with {} requires a browser", provider.provider_id),
        ))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.session().publish(None);
        Ok(())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

impl AccountResponse {
    fn into_user(self) -> ProviderUser {
        ProviderUser {
            uid: self.local_id,
            email: self.email.filter(|e| !e.is_empty()),
            display_name: self.display_name.filter(|n| !n.is_empty()),
            email_verified: self.email_verified,
            credential: self.id_token.map(Credential::new),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map a REST error body (`{"error": {"message": "EMAIL_EXISTS"}}`) to a provider error.
///
/// Messages may carry detail after the key, e.g. `WEAK_PASSWORD : Password should be ...`.
/// Unrecognized or unreadable bodies are logged and come back with an empty
/// message, so callers show their own fallback text instead of raw HTTP output.
pub(crate) fn map_rest_error(body: &str) -> ProviderError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return ProviderError::unexpected(format_args!("identity error body: {body}"));
    };
    let message = envelope.error.message;
    let key = message.split([' ', ':']).next().unwrap_or_default();
    let code = match key {
        "EMAIL_NOT_FOUND" => codes::USER_NOT_FOUND,
        "INVALID_PASSWORD" => codes::WRONG_PASSWORD,
        "INVALID_LOGIN_CREDENTIALS" => codes::INVALID_CREDENTIAL,
        "USER_DISABLED" => codes::USER_DISABLED,
        "EMAIL_EXISTS" => codes::EMAIL_ALREADY_IN_USE,
        "INVALID_EMAIL" => codes::INVALID_EMAIL,
        "WEAK_PASSWORD" => codes::WEAK_PASSWORD,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => codes::TOO_MANY_REQUESTS,
        "OPERATION_NOT_ALLOWED" => codes::OPERATION_NOT_ALLOWED,
        "CONFIGURATION_NOT_FOUND" => codes::CONFIGURATION_NOT_FOUND,
        "INVALID_ID_TOKEN" => codes::INVALID_USER_TOKEN,
        "TOKEN_EXPIRED" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => codes::USER_TOKEN_EXPIRED,
        "USER_NOT_FOUND" => codes::USER_NOT_FOUND,
        _ => {
            tracing::warn!(%message, "unrecognized identity error");
            return ProviderError::new(codes::INTERNAL_ERROR, "");
        }
    };
    ProviderError::new(code, message)
}

fn is_session_invalidating(code: &str) -> bool {
    matches!(
        code,
        codes::INVALID_USER_TOKEN | codes::USER_TOKEN_EXPIRED | codes::USER_DISABLED | codes::USER_NOT_FOUND
    )
}

#[cfg(test)]
#[path = "identity_toolkit_test.rs"]
mod tests;
