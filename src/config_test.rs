use std::collections::HashMap;

use super::*;
use crate::provider::IdentityProvider;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

// =============================================================================
// parse_bool
// =============================================================================

#[test]
fn parse_bool_variants() {
    for val in ["1", "true", "YES", " On "] {
        assert_eq!(parse_bool(val), Some(true), "expected true for {val:?}");
    }
    for val in ["0", "false", "No", "off"] {
        assert_eq!(parse_bool(val), Some(false), "expected false for {val:?}");
    }
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_bool(""), None);
}

// =============================================================================
// AppConfig
// =============================================================================

#[test]
fn app_config_defaults() {
    let config = AppConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert!(config.google_sign_in);
    assert!(!config.cookie_secure);
    assert_eq!(config.client_idle_ttl, Duration::from_secs(1800));
    assert_eq!(config.client_sweep_interval, Duration::from_secs(60));
    assert_eq!(config.session_ready_timeout, Duration::from_millis(2000));
    assert_eq!(config.provider_timeouts, ProviderTimeouts::default());
}

#[test]
fn app_config_overrides() {
    let config = AppConfig::from_lookup(lookup(&[
        ("PORT", "8080"),
        ("GOOGLE_SIGN_IN", "off"),
        ("COOKIE_SECURE", "true"),
        ("CLIENT_IDLE_TTL_SECS", "60"),
        ("SESSION_READY_TIMEOUT_MS", "150"),
        ("PROVIDER_REQUEST_TIMEOUT_SECS", "3"),
    ]))
    .unwrap();
    assert_eq!(config.port, 8080);
    assert!(!config.google_sign_in);
    assert!(config.cookie_secure);
    assert_eq!(config.client_idle_ttl, Duration::from_secs(60));
    assert_eq!(config.session_ready_timeout, Duration::from_millis(150));
    assert_eq!(config.provider_timeouts.request_secs, 3);
}

#[test]
fn app_config_bad_numbers_fall_back_but_bad_port_fails() {
    let config = AppConfig::from_lookup(lookup(&[("CLIENT_IDLE_TTL_SECS", "soon")])).unwrap();
    assert_eq!(config.client_idle_ttl, Duration::from_secs(DEFAULT_CLIENT_IDLE_TTL_SECS));

    let err = AppConfig::from_lookup(lookup(&[("PORT", "99999")])).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigParse(_)));
}

#[test]
fn zero_sweep_interval_is_clamped() {
    let config = AppConfig::from_lookup(lookup(&[("CLIENT_SWEEP_INTERVAL_SECS", "0")])).unwrap();
    assert_eq!(config.client_sweep_interval, Duration::from_secs(1));
}

// =============================================================================
// BackendConfig
// =============================================================================

#[test]
fn backend_defaults_to_memory_without_google() {
    let config = BackendConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, BackendConfig::Memory { google: None });
    assert_eq!(config.kind(), "memory");
}

#[test]
fn memory_backend_google_account() {
    let config = BackendConfig::from_lookup(lookup(&[("MEMORY_GOOGLE_EMAIL", "fan@gmail.com")])).unwrap();
    assert_eq!(
        config,
        BackendConfig::Memory {
            google: Some(GoogleAccountConfig { email: "fan@gmail.com".into(), name: "Google User".into() })
        }
    );
}

#[test]
fn identity_toolkit_requires_api_key() {
    let err = BackendConfig::from_lookup(lookup(&[("IDENTITY_BACKEND", "identity_toolkit")])).unwrap_err();
    assert_eq!(err, ConfigError::MissingVar { var: "IDENTITY_API_KEY" });
}

#[test]
fn identity_toolkit_with_firestore() {
    let config = BackendConfig::from_lookup(lookup(&[
        ("IDENTITY_BACKEND", "identity_toolkit"),
        ("IDENTITY_API_KEY", "k"),
        ("FIRESTORE_PROJECT_ID", "mentor-prod"),
    ]))
    .unwrap();
    let BackendConfig::IdentityToolkit { api_key, base_url, firestore } = config else {
        panic!("expected identity toolkit");
    };
    assert_eq!(api_key, "k");
    assert_eq!(base_url, DEFAULT_IDENTITY_BASE_URL);
    assert_eq!(firestore.unwrap().project_id, "mentor-prod");
}

#[test]
fn unknown_backend_is_parse_error() {
    let err = BackendConfig::from_lookup(lookup(&[("IDENTITY_BACKEND", "ldap")])).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigParse(_)));
}

#[tokio::test]
async fn built_memory_backend_hands_out_independent_providers() {
    let backend = BackendConfig::Memory { google: None }
        .build(ProviderTimeouts::default())
        .unwrap();
    assert!(backend.profiles().is_some());

    let a = backend.connect();
    let b = backend.connect();
    a.create_user("a@b.com", "hunter22").await.unwrap();
    // Same directory: the account is visible to the second instance.
    b.sign_in_with_password("a@b.com", "hunter22").await.unwrap();
}
