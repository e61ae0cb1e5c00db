//! Service registry implementation
//!
//! Maps each name to the single connection currently receiving its traffic.
//! Registration is last-writer-wins and there is no unregister message;
//! bindings disappear only when their connection closes.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::entry::{ConnectionHandle, RegistryEntry};
use super::error::RegistryError;
use crate::protocol::ServiceName;

/// Name to connection table owned by the router
///
/// Shared by every connection task through an `RwLock`.
pub struct ServiceRegistry {
    services: RwLock<HashMap<ServiceName, RegistryEntry>>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
        }
    }

    /// Bind `name` to a connection
    ///
    /// An existing binding held by another session is silently replaced;
    /// its session ID is returned so the caller can log the takeover.
    pub async fn register(&self, name: ServiceName, handle: ConnectionHandle) -> Option<u64> {
        let session_id = handle.session_id();
        let mut services = self.services.write().await;

        let previous = services
            .insert(name, RegistryEntry::new(handle))
            .map(|entry| entry.handle.session_id())
            .filter(|prev| *prev != session_id);

        match previous {
            Some(prev) => tracing::info!(
                service = %name,
                session_id = session_id,
                superseded = prev,
                "Service registered (superseding previous holder)"
            ),
            None => tracing::info!(service = %name, session_id = session_id, "Service registered"),
        }

        previous
    }

    /// Connection currently bound to `name`
    pub async fn lookup(&self, name: &ServiceName) -> Option<ConnectionHandle> {
        self.services
            .read()
            .await
            .get(name)
            .map(|entry| entry.handle.clone())
    }

    /// Like [`lookup`](Self::lookup), failing when the name is unbound
    pub async fn route(&self, name: &ServiceName) -> Result<ConnectionHandle, RegistryError> {
        self.lookup(name)
            .await
            .ok_or(RegistryError::NotRegistered(*name))
    }

    /// Drop the binding for `name` if `session_id` still holds it
    pub async fn release(&self, name: &ServiceName, session_id: u64) -> bool {
        let mut services = self.services.write().await;

        let held = services
            .get(name)
            .is_some_and(|entry| entry.handle.session_id() == session_id);
        if held {
            services.remove(name);
            tracing::debug!(service = %name, session_id = session_id, "Service released");
        }
        held
    }

    /// Remove every name bound to a closing session
    pub async fn release_session(&self, session_id: u64) -> Vec<ServiceName> {
        let mut services = self.services.write().await;

        let names: Vec<ServiceName> = services
            .iter()
            .filter(|(_, entry)| entry.handle.session_id() == session_id)
            .map(|(name, _)| *name)
            .collect();

        for name in &names {
            services.remove(name);
            tracing::info!(service = %name, session_id = session_id, "Service unregistered");
        }

        names
    }

    /// Whether `name` is bound
    pub async fn is_registered(&self, name: &ServiceName) -> bool {
        self.services.read().await.contains_key(name)
    }

    /// Snapshot of all bindings as `(name, session_id)`
    pub async fn bindings(&self) -> Vec<(ServiceName, u64)> {
        let mut bindings: Vec<_> = self
            .services
            .read()
            .await
            .iter()
            .map(|(name, entry)| (*name, entry.handle.session_id()))
            .collect();
        bindings.sort();
        bindings
    }

    /// Number of bound names
    pub async fn service_count(&self) -> usize {
        self.services.read().await.len()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;

    fn handle(session_id: u64) -> (ConnectionHandle, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(8);
        let addr = "127.0.0.1:5001".parse().unwrap();
        (ConnectionHandle::new(session_id, addr, tx), rx)
    }

    fn name(s: &str) -> ServiceName {
        ServiceName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ServiceRegistry::new();
        let (h1, _rx) = handle(1);

        assert_eq!(registry.register(name("catal"), h1).await, None);
        assert!(registry.is_registered(&name("catal")).await);
        assert_eq!(
            registry.lookup(&name("catal")).await.unwrap().session_id(),
            1
        );
        assert!(registry.lookup(&name("cart")).await.is_none());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let registry = ServiceRegistry::new();
        let (a, _rx_a) = handle(1);
        let (b, _rx_b) = handle(2);

        registry.register(name("catal"), a).await;
        let superseded = registry.register(name("catal"), b).await;

        assert_eq!(superseded, Some(1));
        assert_eq!(
            registry.lookup(&name("catal")).await.unwrap().session_id(),
            2
        );
        assert_eq!(registry.service_count().await, 1);
    }

    #[tokio::test]
    async fn test_reregister_same_session_is_not_takeover() {
        let registry = ServiceRegistry::new();
        let (a, _rx) = handle(1);

        registry.register(name("catal"), a.clone()).await;
        assert_eq!(registry.register(name("catal"), a).await, None);
    }

    #[tokio::test]
    async fn test_release_session_only_removes_own_names() {
        let registry = ServiceRegistry::new();
        let (a, _rx_a) = handle(1);
        let (b, _rx_b) = handle(2);

        registry.register(name("catal"), a.clone()).await;
        registry.register(name("cart"), a).await;
        registry.register(name("catal"), b).await;

        let released = registry.release_session(1).await;
        assert_eq!(released, vec![name("cart")]);

        // B's takeover of "catal" survives A closing
        assert_eq!(
            registry.lookup(&name("catal")).await.unwrap().session_id(),
            2
        );
        assert!(!registry.is_registered(&name("cart")).await);
    }

    #[tokio::test]
    async fn test_release_checks_holder() {
        let registry = ServiceRegistry::new();
        let (a, _rx) = handle(1);

        registry.register(name("point"), a).await;
        assert!(!registry.release(&name("point"), 7).await);
        assert!(registry.release(&name("point"), 1).await);
        assert!(!registry.is_registered(&name("point")).await);
    }

    #[tokio::test]
    async fn test_route_reports_missing() {
        let registry = ServiceRegistry::new();
        let result = registry.route(&name("ghost")).await;
        assert_eq!(
            result.unwrap_err(),
            RegistryError::NotRegistered(name("ghost"))
        );
    }

    #[tokio::test]
    async fn test_bindings_snapshot() {
        let registry = ServiceRegistry::new();
        let (a, _rx_a) = handle(1);
        let (b, _rx_b) = handle(2);

        registry.register(name("point"), b).await;
        registry.register(name("catal"), a).await;

        assert_eq!(
            registry.bindings().await,
            vec![(name("catal"), 1), (name("point"), 2)]
        );
    }
}
