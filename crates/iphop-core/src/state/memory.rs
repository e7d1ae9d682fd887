// # Memory Store
//
// In-memory implementation of Store.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for throwaway deployments.
//
// ## Crash Behavior
//
// - All providers, domains and history are lost on restart/crash
// - Schedules are rebuilt from whatever the process inserts after startup

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::Tables;
use crate::Error;
use crate::model::{
    Domain, DomainId, IpHistory, NewDomain, NewHistory, NewProvider, Provider, ProviderId,
    StatusUpdate,
};
use crate::traits::Store;

/// In-memory store implementation
///
/// All rows live in one table set protected by a RwLock. Clones share the
/// same tables.
///
/// # Example
///
/// ```rust,no_run
/// use iphop_core::model::{NewDomain, NewProvider};
/// use iphop_core::state::MemoryStore;
/// use iphop_core::traits::Store;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///
///     let provider = store
///         .insert_provider(NewProvider {
///             name: "home".into(),
///             kind: "duckdns".into(),
///             credentials_encrypted: String::new(),
///             is_enabled: true,
///         })
///         .await?;
///
///     let domain = store
///         .insert_domain(NewDomain {
///             provider_id: provider.id,
///             domain_name: "home.duckdns.org".into(),
///             ..Default::default()
///         })
///         .await?;
///
///     assert!(store.get_domain(domain.id).await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of domains in the store
    pub async fn domain_count(&self) -> usize {
        self.inner.read().await.domains().len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>, Error> {
        Ok(self.inner.read().await.provider(id))
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, Error> {
        Ok(self.inner.read().await.providers())
    }

    async fn insert_provider(&self, provider: NewProvider) -> Result<Provider, Error> {
        self.inner.write().await.insert_provider(provider)
    }

    async fn set_provider_enabled(&self, id: ProviderId, enabled: bool) -> Result<(), Error> {
        self.inner.write().await.set_provider_enabled(id, enabled)
    }

    async fn delete_provider(&self, id: ProviderId) -> Result<bool, Error> {
        Ok(self.inner.write().await.delete_provider(id))
    }

    async fn get_domain(&self, id: DomainId) -> Result<Option<Domain>, Error> {
        Ok(self.inner.read().await.domain(id))
    }

    async fn list_domains(&self) -> Result<Vec<Domain>, Error> {
        Ok(self.inner.read().await.domains())
    }

    async fn list_scheduled_domains(&self) -> Result<Vec<Domain>, Error> {
        Ok(self.inner.read().await.scheduled_domains())
    }

    async fn insert_domain(&self, domain: NewDomain) -> Result<Domain, Error> {
        self.inner.write().await.insert_domain(domain)
    }

    async fn set_cron_schedule(&self, id: DomainId, cron: Option<String>) -> Result<(), Error> {
        self.inner.write().await.set_cron_schedule(id, cron)
    }

    async fn delete_domain(&self, id: DomainId) -> Result<bool, Error> {
        Ok(self.inner.write().await.delete_domain(id))
    }

    async fn commit_attempt(
        &self,
        history: NewHistory,
        status: Option<StatusUpdate>,
    ) -> Result<IpHistory, Error> {
        self.inner.write().await.commit_attempt(history, status)
    }

    async fn list_history(
        &self,
        domain_id: DomainId,
        limit: Option<usize>,
    ) -> Result<Vec<IpHistory>, Error> {
        Ok(self.inner.read().await.history(domain_id, limit))
    }

    async fn count_history(&self, domain_id: DomainId) -> Result<usize, Error> {
        Ok(self.inner.read().await.count_history(domain_id))
    }

    async fn delete_history_beyond(&self, domain_id: DomainId, keep: usize) -> Result<usize, Error> {
        Ok(self.inner.write().await.delete_history_beyond(domain_id, keep))
    }

    async fn flush(&self) -> Result<(), Error> {
        // No-op for memory store (everything is already "persisted")
        Ok(())
    }
}
