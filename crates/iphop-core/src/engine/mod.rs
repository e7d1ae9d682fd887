//! Update orchestration
//!
//! The UpdateOrchestrator is responsible for:
//! - Loading the domain and refusing disabled providers
//! - Resolving the current public IP
//! - Building the vendor adapter from decrypted credentials
//! - Recording one history row per attempt and the domain status fields
//! - Enforcing the per-domain history retention limit
//!
//! ## Architecture
//!
//! ```text
//!        update(domain_id)
//!               │
//!               ▼
//!   ┌───────────────────────┐      ┌──────────────┐
//!   │  UpdateOrchestrator   │─────▶│  IpResolver  │
//!   └───────────────────────┘      └──────────────┘
//!      │        │        │
//!      ▼        ▼        ▼
//! ┌────────┐ ┌──────┐ ┌─────────────────┐
//! │ Store  │ │Vault │ │ProviderFactory  │──▶ DnsProvider
//! └────────┘ └──────┘ └─────────────────┘
//! ```
//!
//! ## Step Order
//!
//! 1. Load domain (`DomainNotFound`)
//! 2. Load provider (`ProviderNotFound`, `ProviderDisabled`)
//! 3. Resolve IP; on failure record a FAILED row against `0.0.0.0` and re-raise
//! 4. Decrypt credentials and build the adapter
//! 5. Build the vendor target from the domain
//! 6. Call the adapter and record the outcome

mod locks;

pub use locks::DomainLocks;

use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    Domain, DomainId, DomainTarget, NewHistory, Provider, StatusUpdate, UpdateStatus,
};
use crate::traits::{CredentialVault, IpResolver, ProviderFactory, Store};

/// History rows kept per domain
pub const HISTORY_RETENTION: usize = 20;

/// Address recorded when no IP could be resolved
pub const UNRESOLVED_IP: &str = "0.0.0.0";

pub const MSG_UPDATED: &str = "Updated successfully";
pub const MSG_REJECTED: &str = "Provider rejected update";

/// Runs a single update attempt for a domain
pub struct UpdateOrchestrator {
    store: Arc<dyn Store>,
    resolver: Arc<dyn IpResolver>,
    factory: Arc<dyn ProviderFactory>,
    vault: Arc<dyn CredentialVault>,
    locks: DomainLocks,
}

impl UpdateOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        resolver: Arc<dyn IpResolver>,
        factory: Arc<dyn ProviderFactory>,
        vault: Arc<dyn CredentialVault>,
    ) -> Self {
        Self {
            store,
            resolver,
            factory,
            vault,
            locks: DomainLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn resolver(&self) -> &Arc<dyn IpResolver> {
        &self.resolver
    }

    pub fn vault(&self) -> &Arc<dyn CredentialVault> {
        &self.vault
    }

    pub fn locks(&self) -> &DomainLocks {
        &self.locks
    }

    /// Resolve the current IP and push it to the domain's provider
    ///
    /// Does not compare against the last known IP; callers that want the
    /// change gate use the scheduler.
    pub async fn update(&self, domain_id: DomainId) -> Result<bool> {
        let lock = self.locks.get(domain_id);
        let _guard = lock.lock().await;

        let (domain, provider) = self.load_enabled(domain_id).await?;

        let ip = match self.resolver.resolve().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("IP resolution failed for {}: {}", domain.domain_name, e);
                let row = NewHistory::new(
                    domain.id,
                    UNRESOLVED_IP,
                    UpdateStatus::Failed,
                    format!("IP Fetch Error: {}", e),
                );
                if let Err(store_err) = self.record(row, None).await {
                    error!(
                        "Failed to record IP fetch failure for domain {}: {}",
                        domain.id, store_err
                    );
                }
                return Err(e);
            }
        };

        self.publish(&domain, &provider, ip).await
    }

    /// Push an already resolved IP to the domain's provider
    pub async fn update_with_ip(&self, domain_id: DomainId, ip: Ipv4Addr) -> Result<bool> {
        let lock = self.locks.get(domain_id);
        let _guard = lock.lock().await;

        let (domain, provider) = self.load_enabled(domain_id).await?;
        self.publish(&domain, &provider, ip).await
    }

    async fn load_enabled(&self, domain_id: DomainId) -> Result<(Domain, Provider)> {
        let domain = self
            .store
            .get_domain(domain_id)
            .await?
            .ok_or(Error::DomainNotFound(domain_id))?;

        let provider = self
            .store
            .get_provider(domain.provider_id)
            .await?
            .ok_or(Error::ProviderNotFound(domain.provider_id))?;

        if !provider.is_enabled {
            debug!(
                "Provider {} is disabled, refusing update for {}",
                provider.name, domain.domain_name
            );
            return Err(Error::ProviderDisabled(provider.name));
        }

        Ok((domain, provider))
    }

    async fn publish(&self, domain: &Domain, provider: &Provider, ip: Ipv4Addr) -> Result<bool> {
        let ip_text = ip.to_string();

        match self.call_adapter(domain, provider, ip).await {
            Ok(true) => {
                info!("Updated {} -> {}", domain.domain_name, ip);
                let row = NewHistory::new(domain.id, &ip_text, UpdateStatus::Success, MSG_UPDATED);
                let status = StatusUpdate {
                    last_known_ip: Some(ip_text.clone()),
                    status: UpdateStatus::Success,
                };
                self.record(row, Some(status)).await?;
                Ok(true)
            }
            Ok(false) => {
                warn!("{} rejected update of {} to {}", provider.name, domain.domain_name, ip);
                let row = NewHistory::new(domain.id, &ip_text, UpdateStatus::Failed, MSG_REJECTED);
                let status = StatusUpdate {
                    last_known_ip: None,
                    status: UpdateStatus::Failed,
                };
                self.record(row, Some(status)).await?;
                Ok(false)
            }
            Err(e) => {
                error!("Update failed for {}: {}", domain.domain_name, e);
                let row =
                    NewHistory::new(domain.id, &ip_text, UpdateStatus::Failed, e.to_string());
                let status = StatusUpdate {
                    last_known_ip: None,
                    status: UpdateStatus::Failed,
                };
                if let Err(store_err) = self.record(row, Some(status)).await {
                    error!(
                        "Failed to record update failure for domain {}: {}",
                        domain.id, store_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn call_adapter(&self, domain: &Domain, provider: &Provider, ip: Ipv4Addr) -> Result<bool> {
        let kind = provider.kind()?;
        let credentials = self.vault.decrypt(&provider.credentials_encrypted)?;
        let adapter = self.factory.create(kind, &credentials)?;
        let target = DomainTarget::for_domain(kind, domain);

        debug!(
            "Calling {} for {} with {}",
            adapter.provider_name(),
            target.name(),
            ip
        );
        adapter.update_record(ip, &target).await
    }

    /// Commit one attempt, then trim the domain's history to the retention limit
    async fn record(&self, row: NewHistory, status: Option<StatusUpdate>) -> Result<()> {
        let domain_id = row.domain_id;
        self.store.commit_attempt(row, status).await?;

        let purged = self
            .store
            .delete_history_beyond(domain_id, HISTORY_RETENTION)
            .await?;
        if purged > 0 {
            info!(
                "Cleaned up {} old history records for domain {}",
                purged, domain_id
            );
        }
        Ok(())
    }
}
