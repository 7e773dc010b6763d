use std::sync::Arc;

use sportsmentor::config::{AppConfig, BackendConfig};
use sportsmentor::routes;
use sportsmentor::services::registry::{ClientRegistry, spawn_sweeper};
use sportsmentor::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid server configuration");
            std::process::exit(1);
        }
    };

    // A broken identity backend is not fatal: every client resolves to
    // anonymous and operations report an uninitialized provider.
    let backend = match BackendConfig::from_env().and_then(|b| {
        let kind = b.kind();
        b.build(config.provider_timeouts).map(|backend| (kind, backend))
    }) {
        Ok((kind, backend)) => {
            tracing::info!(backend = kind, "identity backend ready");
            Some(backend)
        }
        Err(e) => {
            tracing::error!(error = %e, "identity backend failed to initialize");
            None
        }
    };

    let registry = Arc::new(ClientRegistry::new(backend, config.google_sign_in));
    let _sweeper = spawn_sweeper(Arc::clone(&registry), config.client_idle_ttl, config.client_sweep_interval);

    let app = routes::app(AppState::new(registry, &config));
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, port = config.port, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(port = config.port, "sportsmentor listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
