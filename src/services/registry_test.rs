use super::*;
use crate::error::AuthError;
use crate::provider::memory::MemoryDirectory;
use crate::services::session::SessionPhase;

const READY: Duration = Duration::from_secs(2);

fn memory_registry() -> (MemoryDirectory, ClientRegistry) {
    let dir = MemoryDirectory::new().with_google_account("fan@gmail.com", "Fan");
    let backend: Arc<dyn IdentityBackend> = Arc::new(dir.clone());
    (dir, ClientRegistry::new(Some(backend), true))
}

#[tokio::test]
async fn same_client_gets_same_manager() {
    let (_, registry) = memory_registry();
    let a = registry.manager("client-a").await;
    let again = registry.manager("client-a").await;
    let b = registry.manager("client-b").await;

    assert!(Arc::ptr_eq(&a, &again));
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(registry.client_count().await, 2);
}

#[tokio::test]
async fn managers_are_started_and_independent() {
    let (_, registry) = memory_registry();
    let a = registry.manager("client-a").await;
    let b = registry.manager("client-b").await;
    assert!(a.wait_until_ready(READY).await);
    assert!(b.wait_until_ready(READY).await);

    a.sign_in_with_google().await.unwrap();
    let mut rx = a.watch();
    tokio::time::timeout(READY, rx.wait_for(|s| s.user.is_some()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(a.phase(), SessionPhase::Authenticated);
    assert_eq!(b.phase(), SessionPhase::Anonymous);
}

#[tokio::test]
async fn missing_backend_yields_uninitialized_managers() {
    let registry = ClientRegistry::new(None, true);
    let manager = registry.manager("client-a").await;

    assert!(!manager.snapshot().loading);
    assert_eq!(manager.sign_in("a@b.com", "hunter22").await, Err(AuthError::uninitialized()));
}

#[tokio::test]
async fn google_disabled_is_uninitialized() {
    let backend: Arc<dyn IdentityBackend> = Arc::new(MemoryDirectory::new());
    let registry = ClientRegistry::new(Some(backend), false);
    let manager = registry.manager("client-a").await;

    assert_eq!(manager.sign_in_with_google().await, Err(AuthError::google_uninitialized()));
}

#[tokio::test]
async fn sweep_keeps_recent_clients() {
    let (_, registry) = memory_registry();
    registry.manager("client-a").await;

    assert_eq!(registry.sweep_idle(Duration::from_secs(3600)).await, 0);
    assert_eq!(registry.client_count().await, 1);
}

#[tokio::test]
async fn sweep_evicts_idle_clients_and_replaces_on_return() {
    let (_, registry) = memory_registry();
    let first = registry.manager("client-a").await;

    assert_eq!(registry.sweep_idle(Duration::ZERO).await, 1);
    assert_eq!(registry.client_count().await, 0);

    let second = registry.manager("client-a").await;
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn sweeper_task_evicts_in_background() {
    let (_, registry) = memory_registry();
    let registry = Arc::new(registry);
    registry.manager("client-a").await;

    let sweeper = spawn_sweeper(Arc::clone(&registry), Duration::ZERO, Duration::from_millis(10));
    tokio::time::timeout(READY, async {
        while registry.client_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    sweeper.abort();
}
