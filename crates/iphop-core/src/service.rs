//! Caller-facing operations
//!
//! [`IpHop`] bundles one orchestrator and one scheduler behind the
//! operations an API layer or the daemon needs.

use std::sync::Arc;
use tracing::info;

use crate::engine::UpdateOrchestrator;
use crate::error::{Error, Result};
use crate::model::{
    Credentials, Domain, DomainId, IpHistory, NewDomain, NewProvider, Provider, ProviderId,
    ProviderKind,
};
use crate::scheduler::{ScheduleManager, parse_cron};

/// Facade over the orchestrator and the scheduler
#[derive(Clone)]
pub struct IpHop {
    orchestrator: Arc<UpdateOrchestrator>,
    scheduler: ScheduleManager,
}

impl IpHop {
    pub fn new(orchestrator: Arc<UpdateOrchestrator>) -> Self {
        let scheduler = ScheduleManager::new(Arc::clone(&orchestrator));
        Self {
            orchestrator,
            scheduler,
        }
    }

    pub fn orchestrator(&self) -> &Arc<UpdateOrchestrator> {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &ScheduleManager {
        &self.scheduler
    }

    /// Resolve and publish the current IP now, bypassing the change gate
    pub async fn trigger_manual_update(&self, domain_id: DomainId) -> Result<bool> {
        info!("Manual update requested for domain {}", domain_id);
        self.orchestrator.update(domain_id).await
    }

    /// Set or clear a domain's cron schedule
    ///
    /// With an expression: returns `false` (and stores nothing) when it does
    /// not parse, otherwise stores it and (re)arms the timer. With `None` or
    /// a blank string: clears the stored schedule and returns whether a timer
    /// was cancelled.
    pub async fn schedule_upsert(
        &self,
        domain_id: DomainId,
        cron_expression: Option<&str>,
    ) -> Result<bool> {
        let store = self.orchestrator.store();
        if store.get_domain(domain_id).await?.is_none() {
            return Err(Error::DomainNotFound(domain_id));
        }

        match cron_expression.map(str::trim).filter(|c| !c.is_empty()) {
            Some(expression) => {
                if parse_cron(expression).is_err() {
                    return Ok(self.scheduler.add_schedule(domain_id, expression));
                }
                store
                    .set_cron_schedule(domain_id, Some(expression.to_string()))
                    .await?;
                Ok(self.scheduler.add_schedule(domain_id, expression))
            }
            None => {
                store.set_cron_schedule(domain_id, None).await?;
                Ok(self.scheduler.remove_schedule(domain_id))
            }
        }
    }

    /// Cancel a domain's timer without touching the stored schedule
    pub fn schedule_remove(&self, domain_id: DomainId) -> bool {
        self.scheduler.remove_schedule(domain_id)
    }

    /// Arm timers for every stored schedule
    pub async fn scheduler_load_all(&self) -> Result<usize> {
        let loaded = self.scheduler.load_all_schedules().await?;
        info!("Loaded {} schedule(s)", loaded);
        Ok(loaded)
    }

    pub async fn scheduler_shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    /// Store a provider with its credentials sealed by the vault
    pub async fn create_provider(
        &self,
        name: &str,
        kind: ProviderKind,
        credentials: &Credentials,
        is_enabled: bool,
    ) -> Result<Provider> {
        let sealed = self.orchestrator.vault().encrypt(credentials)?;
        self.orchestrator
            .store()
            .insert_provider(NewProvider {
                name: name.to_string(),
                kind: kind.as_str().to_string(),
                credentials_encrypted: sealed,
                is_enabled,
            })
            .await
    }

    pub async fn set_provider_enabled(&self, provider_id: ProviderId, enabled: bool) -> Result<()> {
        self.orchestrator
            .store()
            .set_provider_enabled(provider_id, enabled)
            .await
    }

    /// Store a domain and arm its timer when it carries a schedule
    ///
    /// An unparseable schedule is rejected before anything is stored.
    pub async fn create_domain(&self, mut domain: NewDomain) -> Result<Domain> {
        domain.cron_schedule = domain
            .cron_schedule
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if let Some(expression) = domain.cron_schedule.as_deref() {
            parse_cron(expression)?;
        }

        let created = self.orchestrator.store().insert_domain(domain).await?;
        if let Some(expression) = created.cron_schedule.as_deref() {
            self.scheduler.add_schedule(created.id, expression);
        }
        Ok(created)
    }

    /// Delete a domain, its history and its timer
    pub async fn delete_domain(&self, domain_id: DomainId) -> Result<bool> {
        self.scheduler.remove_schedule(domain_id);
        let deleted = self.orchestrator.store().delete_domain(domain_id).await?;
        self.orchestrator.locks().forget(domain_id);
        Ok(deleted)
    }

    /// Delete a provider, cascading to its domains, their history and timers
    pub async fn delete_provider(&self, provider_id: ProviderId) -> Result<bool> {
        let store = self.orchestrator.store();
        let owned: Vec<DomainId> = store
            .list_domains()
            .await?
            .into_iter()
            .filter(|d| d.provider_id == provider_id)
            .map(|d| d.id)
            .collect();

        for domain_id in &owned {
            self.scheduler.remove_schedule(*domain_id);
            self.orchestrator.locks().forget(*domain_id);
        }
        store.delete_provider(provider_id).await
    }

    /// Update history for a domain, newest first
    pub async fn domain_history(
        &self,
        domain_id: DomainId,
        limit: Option<usize>,
    ) -> Result<Vec<IpHistory>> {
        self.orchestrator.store().list_history(domain_id, limit).await
    }
}
