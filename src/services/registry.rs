//! Client registry: one session manager per browser client.
//!
//! DESIGN
//! ======
//! Each browser client carries an opaque client cookie. The registry maps it
//! to a `SessionManager` created and started on first use, the same way each
//! browser tab owns its own auth state. A background sweeper evicts clients
//! idle longer than the TTL and cancels their subscriptions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::provider::{FederatedProvider, IdentityBackend};
use crate::services::session::SessionManager;

struct ClientEntry {
    manager: Arc<SessionManager>,
    last_seen: Instant,
}

pub struct ClientRegistry {
    backend: Option<Arc<dyn IdentityBackend>>,
    google_enabled: bool,
    clients: RwLock<HashMap<String, ClientEntry>>,
}

impl ClientRegistry {
    /// `backend` is `None` when the identity provider failed to initialize.
    #[must_use]
    pub fn new(backend: Option<Arc<dyn IdentityBackend>>, google_enabled: bool) -> Self {
        Self { backend, google_enabled, clients: RwLock::new(HashMap::new()) }
    }

    /// Manager for `client_id`, created and started on first use.
    pub async fn manager(&self, client_id: &str) -> Arc<SessionManager> {
        let mut clients = self.clients.write().await;
        if let Some(entry) = clients.get_mut(client_id) {
            entry.last_seen = Instant::now();
            return Arc::clone(&entry.manager);
        }

        let manager = Arc::new(self.build_manager());
        manager.start().await;
        clients.insert(
            client_id.to_owned(),
            ClientEntry { manager: Arc::clone(&manager), last_seen: Instant::now() },
        );
        debug!(clients = clients.len(), "session manager created");
        manager
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Evict clients idle for at least `ttl` and stop their subscriptions.
    ///
    /// Returns the number of evicted clients.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let evicted: Vec<Arc<SessionManager>> = {
            let mut clients = self.clients.write().await;
            let idle: Vec<String> = clients
                .iter()
                .filter(|(_, entry)| entry.last_seen.elapsed() >= ttl)
                .map(|(id, _)| id.clone())
                .collect();
            idle.iter()
                .filter_map(|id| clients.remove(id))
                .map(|entry| entry.manager)
                .collect()
        };

        for manager in &evicted {
            manager.stop();
        }
        evicted.len()
    }

    fn build_manager(&self) -> SessionManager {
        let Some(backend) = &self.backend else {
            return SessionManager::uninitialized();
        };
        let mut manager = SessionManager::new(backend.connect());
        if let Some(profiles) = backend.profiles() {
            manager = manager.with_profiles(profiles);
        }
        if self.google_enabled {
            manager = manager.with_federated(FederatedProvider::google());
        }
        manager
    }
}

/// Spawn the idle-client sweeper. Returns a handle for shutdown.
pub fn spawn_sweeper(registry: Arc<ClientRegistry>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let evicted = registry.sweep_idle(ttl).await;
            if evicted > 0 {
                let remaining = registry.client_count().await;
                info!(evicted, remaining, "evicted idle clients");
            }
        }
    })
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
