//! Server and identity-backend configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Server settings and the identity backend are parsed separately: a bad
//! server setting stops startup, while a backend that cannot be configured
//! only leaves the provider uninitialized so every auth operation reports it.
//! Parsing goes through a lookup function so tests never touch the process
//! environment.

use std::sync::Arc;
use std::time::Duration;

use crate::provider::firestore::{DEFAULT_FIRESTORE_BASE_URL, FirestoreProfiles};
use crate::provider::identity_toolkit::{DEFAULT_IDENTITY_BASE_URL, IdentityToolkitBackend, IdentityToolkitClient};
use crate::provider::IdentityBackend;
use crate::provider::memory::MemoryDirectory;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CLIENT_IDLE_TTL_SECS: u64 = 1800;
pub const DEFAULT_CLIENT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_SESSION_READY_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_PROVIDER_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MEMORY_GOOGLE_NAME: &str = "Google User";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {var}")]
    MissingVar { var: &'static str },
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ProviderTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_PROVIDER_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECS }
    }
}

// =============================================================================
// SERVER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub google_sign_in: bool,
    pub cookie_secure: bool,
    pub client_idle_ttl: Duration,
    pub client_sweep_interval: Duration,
    pub session_ready_timeout: Duration,
    pub provider_timeouts: ProviderTimeouts,
}

impl AppConfig {
    /// Build server config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigParse`] if `PORT` is not a valid port.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Optional:
    /// - `PORT`: default 3000
    /// - `GOOGLE_SIGN_IN`: default true
    /// - `COOKIE_SECURE`: default false
    /// - `CLIENT_IDLE_TTL_SECS`: default 1800
    /// - `CLIENT_SWEEP_INTERVAL_SECS`: default 60
    /// - `SESSION_READY_TIMEOUT_MS`: default 2000
    /// - `PROVIDER_REQUEST_TIMEOUT_SECS`: default 15
    /// - `PROVIDER_CONNECT_TIMEOUT_SECS`: default 5
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigParse`] if `PORT` is not a valid port.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::ConfigParse(format!("invalid PORT: {raw}")))?,
            None => DEFAULT_PORT,
        };
        let parse_u64 = |key: &str, default: u64| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            port,
            google_sign_in: get("GOOGLE_SIGN_IN").as_deref().and_then(parse_bool).unwrap_or(true),
            cookie_secure: get("COOKIE_SECURE").as_deref().and_then(parse_bool).unwrap_or(false),
            client_idle_ttl: Duration::from_secs(parse_u64("CLIENT_IDLE_TTL_SECS", DEFAULT_CLIENT_IDLE_TTL_SECS)),
            client_sweep_interval: Duration::from_secs(
                parse_u64("CLIENT_SWEEP_INTERVAL_SECS", DEFAULT_CLIENT_SWEEP_INTERVAL_SECS).max(1),
            ),
            session_ready_timeout: Duration::from_millis(parse_u64(
                "SESSION_READY_TIMEOUT_MS",
                DEFAULT_SESSION_READY_TIMEOUT_MS,
            )),
            provider_timeouts: ProviderTimeouts {
                request_secs: parse_u64("PROVIDER_REQUEST_TIMEOUT_SECS", DEFAULT_PROVIDER_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_u64("PROVIDER_CONNECT_TIMEOUT_SECS", DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECS),
            },
        })
    }
}

// =============================================================================
// IDENTITY BACKEND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleAccountConfig {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Memory { google: Option<GoogleAccountConfig> },
    IdentityToolkit { api_key: String, base_url: String, firestore: Option<FirestoreConfig> },
}

impl BackendConfig {
    /// # Errors
    ///
    /// See [`BackendConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// - `IDENTITY_BACKEND`: `memory` (default) or `identity_toolkit`
    /// - `MEMORY_GOOGLE_EMAIL`, `MEMORY_GOOGLE_NAME`: simulated Google account
    /// - `IDENTITY_API_KEY`: required for `identity_toolkit`
    /// - `IDENTITY_BASE_URL`, `FIRESTORE_BASE_URL`: REST endpoints
    /// - `FIRESTORE_PROJECT_ID`: enables profile documents
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] if `IDENTITY_API_KEY` is absent for
    /// the REST backend, or [`ConfigError::ConfigParse`] for an unknown backend.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        match non_empty("IDENTITY_BACKEND").as_deref().unwrap_or("memory") {
            "memory" => Ok(Self::Memory {
                google: non_empty("MEMORY_GOOGLE_EMAIL").map(|email| GoogleAccountConfig {
                    email,
                    name: non_empty("MEMORY_GOOGLE_NAME").unwrap_or_else(|| DEFAULT_MEMORY_GOOGLE_NAME.to_owned()),
                }),
            }),
            "identity_toolkit" => {
                let api_key = non_empty("IDENTITY_API_KEY").ok_or(ConfigError::MissingVar { var: "IDENTITY_API_KEY" })?;
                let base_url = non_empty("IDENTITY_BASE_URL").unwrap_or_else(|| DEFAULT_IDENTITY_BASE_URL.to_owned());
                let firestore = non_empty("FIRESTORE_PROJECT_ID").map(|project_id| FirestoreConfig {
                    project_id,
                    base_url: non_empty("FIRESTORE_BASE_URL").unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_owned()),
                });
                Ok(Self::IdentityToolkit { api_key, base_url, firestore })
            }
            other => Err(ConfigError::ConfigParse(format!("unknown IDENTITY_BACKEND: {other}"))),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory { .. } => "memory",
            Self::IdentityToolkit { .. } => "identity_toolkit",
        }
    }

    /// Construct the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if a REST client cannot be built.
    pub fn build(&self, timeouts: ProviderTimeouts) -> Result<Arc<dyn IdentityBackend>, ConfigError> {
        match self {
            Self::Memory { google } => {
                let mut directory = MemoryDirectory::new();
                if let Some(google) = google {
                    directory = directory.with_google_account(&google.email, &google.name);
                }
                Ok(Arc::new(directory))
            }
            Self::IdentityToolkit { api_key, base_url, firestore } => {
                let client = IdentityToolkitClient::new(api_key.clone(), base_url, timeouts)?;
                let profiles = firestore
                    .as_ref()
                    .map(|f| FirestoreProfiles::new(f.project_id.clone(), &f.base_url, timeouts))
                    .transpose()?;
                Ok(Arc::new(IdentityToolkitBackend::new(client, profiles)))
            }
        }
    }
}

/// Parse a boolean flag (`1/true/yes/on`, `0/false/no/off`), case-insensitive.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
