//! In-process identity backend.
//!
//! DESIGN
//! ======
//! `MemoryDirectory` is the shared account store (the "hosted service");
//! each `connect()` yields a `MemoryProvider` with its own current user, the
//! way every browser tab runs its own SDK instance against one project.
//! Passwords are stored as salted SHA-256 hashes.
//!
//! TRADE-OFFS
//! ==========
//! Failed password attempts lock an account after `MAX_FAILED_ATTEMPTS`
//! until a successful sign-in elsewhere resets it; there is no time-based
//! unlock. The Google popup is simulated: outcomes can be scripted, and an
//! empty script approves with the configured Google account.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use uuid::Uuid;

use super::notifier::Notifier;
use super::{
    ChangeStream, Credential, FederatedProvider, IdentityBackend, IdentityProvider, ProfileDocument, ProfileStore,
    ProviderError, ProviderUser, codes,
};
use crate::token::{generate_salt, generate_token, hash_secret};
use crate::validate::{meets_password_minimum, normalize_email};

/// Consecutive wrong passwords before an account reports `too-many-requests`.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

const GOOGLE_PROVIDER_ID: &str = "google.com";

/// Scripted result of the next simulated popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    Approve,
    Close,
    Block,
}

struct Account {
    uid: String,
    email: String,
    salt: String,
    /// `None` for accounts created through federated sign-in only.
    password_hash: Option<String>,
    display_name: Option<String>,
    email_verified: bool,
    failed_attempts: u32,
}

impl Account {
    fn to_user(&self) -> ProviderUser {
        ProviderUser {
            uid: self.uid.clone(),
            email: Some(self.email.clone()),
            display_name: self.display_name.clone(),
            email_verified: self.email_verified,
            credential: Some(Credential::new(generate_token())),
        }
    }
}

#[derive(Debug, Clone)]
struct GoogleAccount {
    email: String,
    name: String,
}

#[derive(Default)]
struct Directory {
    /// Keyed by normalized email.
    accounts: HashMap<String, Account>,
    /// Keyed by uid.
    profiles: HashMap<String, ProfileDocument>,
    google: Option<GoogleAccount>,
    popup_script: VecDeque<PopupOutcome>,
    instances: Vec<Weak<MemoryProvider>>,
}

// =============================================================================
// DIRECTORY
// =============================================================================

/// Shared in-memory account and profile store.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<Directory>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable simulated Google sign-in, approving as the given account.
    #[must_use]
    pub fn with_google_account(self, email: &str, name: &str) -> Self {
        self.lock().google = Some(GoogleAccount { email: email.to_owned(), name: name.to_owned() });
        self
    }

    /// Script the outcome of the next simulated popup.
    pub fn queue_popup_outcome(&self, outcome: PopupOutcome) {
        self.lock().popup_script.push_back(outcome);
    }

    /// Invalidate every live session for `uid`, as if revoked from another device.
    ///
    /// Returns the number of provider instances that dropped a session.
    pub fn revoke_sessions(&self, uid: &str) -> usize {
        let instances: Vec<Arc<MemoryProvider>> = {
            let mut dir = self.lock();
            dir.instances.retain(|w| w.strong_count() > 0);
            dir.instances.iter().filter_map(Weak::upgrade).collect()
        };
        instances
            .iter()
            .filter(|provider| provider.drop_session_for(uid))
            .count()
    }

    /// Open a provider instance registered for revocation.
    #[must_use]
    pub fn open(&self) -> Arc<MemoryProvider> {
        let provider = Arc::new(MemoryProvider { directory: self.clone(), session: Mutex::new(Notifier::default()) });
        let mut dir = self.lock();
        dir.instances.retain(|w| w.strong_count() > 0);
        dir.instances.push(Arc::downgrade(&provider));
        drop(dir);
        provider
    }

    fn lock(&self) -> MutexGuard<'_, Directory> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdentityBackend for MemoryDirectory {
    fn connect(&self) -> Arc<dyn IdentityProvider> {
        self.open()
    }

    fn profiles(&self) -> Option<Arc<dyn ProfileStore>> {
        Some(Arc::new(self.clone()))
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryDirectory {
    async fn read_profile(&self, user: &ProviderUser) -> Result<Option<ProfileDocument>, ProviderError> {
        Ok(self.lock().profiles.get(&user.uid).cloned())
    }

    async fn write_profile(&self, user: &ProviderUser, doc: &ProfileDocument) -> Result<(), ProviderError> {
        let mut dir = self.lock();
        if !dir.accounts.values().any(|a| a.uid == user.uid) {
            return Err(ProviderError::new(codes::USER_NOT_FOUND, "no account for profile document"));
        }
        dir.profiles.insert(user.uid.clone(), doc.clone());
        Ok(())
    }
}

// =============================================================================
// PROVIDER INSTANCE
// =============================================================================

/// One client's view of the directory, with its own current user.
pub struct MemoryProvider {
    directory: MemoryDirectory,
    session: Mutex<Notifier>,
}

impl MemoryProvider {
    fn session(&self) -> MutexGuard<'_, Notifier> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, user: Option<ProviderUser>) {
        self.session().publish(user);
    }

    fn drop_session_for(&self, uid: &str) -> bool {
        let mut session = self.session();
        if session.current().is_some_and(|u| u.uid == uid) {
            session.publish(None);
            return true;
        }
        false
    }
}

fn invalid_email() -> ProviderError {
    ProviderError::new(codes::INVALID_EMAIL, "The email address is badly formatted.")
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryProvider {
    async fn subscribe(&self) -> Result<ChangeStream, ProviderError> {
        Ok(self.session().subscribe())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        let key = normalize_email(email).ok_or_else(invalid_email)?;
        let user = {
            let mut dir = self.directory.lock();
            let Some(account) = dir.accounts.get_mut(&key) else {
                return Err(ProviderError::new(codes::USER_NOT_FOUND, "There is no user record for this email."));
            };
            if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
                return Err(ProviderError::new(
                    codes::TOO_MANY_REQUESTS,
                    "Access to this account has been temporarily disabled due to many failed login attempts.",
                ));
            }
            let matches = account
                .password_hash
                .as_deref()
                .is_some_and(|hash| hash == hash_secret(&account.salt, password));
            if !matches {
                account.failed_attempts += 1;
                return Err(ProviderError::new(codes::WRONG_PASSWORD, "The password is invalid."));
            }
            account.failed_attempts = 0;
            account.to_user()
        };

        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        let key = normalize_email(email).ok_or_else(invalid_email)?;
        if !meets_password_minimum(password) {
            return Err(ProviderError::new(codes::WEAK_PASSWORD, "Password should be at least 6 characters."));
        }

        let user = {
            let mut dir = self.directory.lock();
            if dir.accounts.contains_key(&key) {
                return Err(ProviderError::new(
                    codes::EMAIL_ALREADY_IN_USE,
                    "The email address is already in use by another account.",
                ));
            }
            let salt = generate_salt();
            let account = Account {
                uid: Uuid::new_v4().simple().to_string(),
                email: key.clone(),
                password_hash: Some(hash_secret(&salt, password)),
                salt,
                display_name: None,
                email_verified: false,
                failed_attempts: 0,
            };
            let user = account.to_user();
            dir.accounts.insert(key, account);
            user
        };

        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn update_profile(&self, user: &ProviderUser, display_name: &str) -> Result<(), ProviderError> {
        {
            let mut dir = self.directory.lock();
            let Some(account) = dir.accounts.values_mut().find(|a| a.uid == user.uid) else {
                return Err(ProviderError::new(codes::USER_NOT_FOUND, "There is no user record for this identifier."));
            };
            account.display_name = Some(display_name.to_owned());
        }

        // Profile changes reach consumers as a fresh notification.
        let mut session = self.session();
        let updated = session
            .current()
            .filter(|u| u.uid == user.uid)
            .map(|current| ProviderUser { display_name: Some(display_name.to_owned()), ..current.clone() });
        if let Some(updated) = updated {
            session.publish(Some(updated));
        }
        Ok(())
    }

    async fn sign_in_with_popup(&self, provider: &FederatedProvider) -> Result<ProviderUser, ProviderError> {
        let user = {
            let mut dir = self.directory.lock();
            if provider.provider_id != GOOGLE_PROVIDER_ID {
                return Err(ProviderError::new(
                    codes::OPERATION_NOT_ALLOWED,
                    format!("federated provider {} is not enabled", provider.provider_id),
                ));
            }
            let Some(google) = dir.google.clone() else {
                return Err(ProviderError::new(codes::CONFIGURATION_NOT_FOUND, "Google sign-in is not configured."));
            };
            match dir.popup_script.pop_front().unwrap_or(PopupOutcome::Approve) {
                PopupOutcome::Approve => {}
                PopupOutcome::Close => {
                    return Err(ProviderError::new(codes::POPUP_CLOSED_BY_USER, "The popup has been closed by the user."));
                }
                PopupOutcome::Block => {
                    return Err(ProviderError::new(codes::POPUP_BLOCKED, "Unable to establish a connection with the popup."));
                }
            }

            let key = normalize_email(&google.email).ok_or_else(invalid_email)?;
            let account = dir.accounts.entry(key.clone()).or_insert_with(|| Account {
                uid: Uuid::new_v4().simple().to_string(),
                email: key,
                salt: generate_salt(),
                password_hash: None,
                display_name: None,
                email_verified: true,
                failed_attempts: 0,
            });
            account.email_verified = true;
            if account.display_name.is_none() {
                account.display_name = Some(google.name.clone());
            }
            account.to_user()
        };

        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.publish(None);
        Ok(())
    }
}

#[cfg(test)]
impl MemoryDirectory {
    pub(crate) fn tracked_instances(&self) -> usize {
        self.lock().instances.len()
    }
}

#[cfg(test)]
impl MemoryProvider {
    pub(crate) fn subscriber_count(&self) -> usize {
        self.session().listener_count()
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
