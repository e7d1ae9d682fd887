// # Store Trait
//
// Narrow CRUD interface over providers, domains and update history.
//
// ## Implementations
//
// - In-memory: [`MemoryStore`](crate::state::MemoryStore)
// - JSON file with crash recovery: [`FileStore`](crate::state::FileStore)
// - A relational database can sit behind the same trait
//
// ## Ownership
//
// A provider owns its domains and a domain owns its history: deleting either
// cascades.

use async_trait::async_trait;

use crate::model::{
    Domain, DomainId, IpHistory, NewDomain, NewHistory, NewProvider, Provider, ProviderId,
    StatusUpdate,
};

/// Trait for store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
/// Every mutating call is its own transaction; [`Store::commit_attempt`]
/// writes a history row and the domain status fields as one unit.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>, crate::Error>;

    async fn list_providers(&self) -> Result<Vec<Provider>, crate::Error>;

    /// Insert a provider; names are unique
    async fn insert_provider(&self, provider: NewProvider) -> Result<Provider, crate::Error>;

    async fn set_provider_enabled(
        &self,
        id: ProviderId,
        enabled: bool,
    ) -> Result<(), crate::Error>;

    /// Delete a provider with its domains and their history
    ///
    /// Returns `false` if no such provider existed.
    async fn delete_provider(&self, id: ProviderId) -> Result<bool, crate::Error>;

    async fn get_domain(&self, id: DomainId) -> Result<Option<Domain>, crate::Error>;

    async fn list_domains(&self) -> Result<Vec<Domain>, crate::Error>;

    /// Domains whose cron schedule is set
    async fn list_scheduled_domains(&self) -> Result<Vec<Domain>, crate::Error>;

    /// Insert a domain under an existing provider
    async fn insert_domain(&self, domain: NewDomain) -> Result<Domain, crate::Error>;

    async fn set_cron_schedule(
        &self,
        id: DomainId,
        cron: Option<String>,
    ) -> Result<(), crate::Error>;

    /// Delete a domain with its history
    ///
    /// Returns `false` if no such domain existed.
    async fn delete_domain(&self, id: DomainId) -> Result<bool, crate::Error>;

    /// Append a history row and, when given, rewrite the domain's status
    /// fields in the same transaction
    async fn commit_attempt(
        &self,
        history: NewHistory,
        status: Option<StatusUpdate>,
    ) -> Result<IpHistory, crate::Error>;

    /// History for a domain, newest first (timestamp, then insertion order)
    async fn list_history(
        &self,
        domain_id: DomainId,
        limit: Option<usize>,
    ) -> Result<Vec<IpHistory>, crate::Error>;

    async fn count_history(&self, domain_id: DomainId) -> Result<usize, crate::Error>;

    /// Delete all but the `keep` most recent history rows for a domain
    ///
    /// Returns the number of rows deleted.
    async fn delete_history_beyond(
        &self,
        domain_id: DomainId,
        keep: usize,
    ) -> Result<usize, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
