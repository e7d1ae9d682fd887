// # Store Implementations
//
// This module provides implementations of the Store trait for different
// persistence strategies. Both share the same in-memory tables; the file
// store adds atomic JSON persistence on top.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::model::{
    Domain, DomainId, HistoryId, IpHistory, NewDomain, NewHistory, NewProvider, Provider,
    ProviderId, StatusUpdate,
};

/// Row storage shared by the store implementations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    providers: BTreeMap<ProviderId, Provider>,
    #[serde(default)]
    domains: BTreeMap<DomainId, Domain>,
    /// Append-only, so insertion order is id order
    #[serde(default)]
    history: Vec<IpHistory>,
    #[serde(default)]
    last_provider_id: ProviderId,
    #[serde(default)]
    last_domain_id: DomainId,
    #[serde(default)]
    last_history_id: HistoryId,
}

impl Tables {
    pub(crate) fn provider(&self, id: ProviderId) -> Option<Provider> {
        self.providers.get(&id).cloned()
    }

    pub(crate) fn providers(&self) -> Vec<Provider> {
        self.providers.values().cloned().collect()
    }

    pub(crate) fn insert_provider(&mut self, new: NewProvider) -> Result<Provider> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::store("Provider name cannot be empty"));
        }
        if self.providers.values().any(|p| p.name == name) {
            return Err(Error::store(format!("Provider name already exists: {}", name)));
        }

        self.last_provider_id += 1;
        let provider = Provider {
            id: self.last_provider_id,
            name: name.to_string(),
            kind: new.kind,
            credentials_encrypted: new.credentials_encrypted,
            is_enabled: new.is_enabled,
        };
        self.providers.insert(provider.id, provider.clone());
        Ok(provider)
    }

    pub(crate) fn set_provider_enabled(&mut self, id: ProviderId, enabled: bool) -> Result<()> {
        let provider = self
            .providers
            .get_mut(&id)
            .ok_or(Error::ProviderNotFound(id))?;
        provider.is_enabled = enabled;
        Ok(())
    }

    pub(crate) fn delete_provider(&mut self, id: ProviderId) -> bool {
        if self.providers.remove(&id).is_none() {
            return false;
        }
        let owned: HashSet<DomainId> = self
            .domains
            .values()
            .filter(|d| d.provider_id == id)
            .map(|d| d.id)
            .collect();
        self.domains.retain(|domain_id, _| !owned.contains(domain_id));
        self.history.retain(|h| !owned.contains(&h.domain_id));
        true
    }

    pub(crate) fn domain(&self, id: DomainId) -> Option<Domain> {
        self.domains.get(&id).cloned()
    }

    pub(crate) fn domains(&self) -> Vec<Domain> {
        self.domains.values().cloned().collect()
    }

    pub(crate) fn scheduled_domains(&self) -> Vec<Domain> {
        self.domains
            .values()
            .filter(|d| d.cron_schedule.as_deref().is_some_and(|c| !c.trim().is_empty()))
            .cloned()
            .collect()
    }

    pub(crate) fn insert_domain(&mut self, new: NewDomain) -> Result<Domain> {
        if !self.providers.contains_key(&new.provider_id) {
            return Err(Error::ProviderNotFound(new.provider_id));
        }

        self.last_domain_id += 1;
        let domain = Domain {
            id: self.last_domain_id,
            provider_id: new.provider_id,
            domain_name: new.domain_name,
            external_id: new.external_id,
            config: new.config,
            last_known_ip: None,
            last_update_status: None,
            cron_schedule: new.cron_schedule,
        };
        self.domains.insert(domain.id, domain.clone());
        Ok(domain)
    }

    pub(crate) fn set_cron_schedule(&mut self, id: DomainId, cron: Option<String>) -> Result<()> {
        let domain = self.domains.get_mut(&id).ok_or(Error::DomainNotFound(id))?;
        domain.cron_schedule = cron;
        Ok(())
    }

    pub(crate) fn delete_domain(&mut self, id: DomainId) -> bool {
        if self.domains.remove(&id).is_none() {
            return false;
        }
        self.history.retain(|h| h.domain_id != id);
        true
    }

    pub(crate) fn commit_attempt(
        &mut self,
        new: NewHistory,
        status: Option<StatusUpdate>,
    ) -> Result<IpHistory> {
        let domain = self
            .domains
            .get_mut(&new.domain_id)
            .ok_or(Error::DomainNotFound(new.domain_id))?;

        if let Some(update) = status {
            if let Some(ip) = update.last_known_ip {
                domain.last_known_ip = Some(ip);
            }
            domain.last_update_status = Some(update.status);
        }

        self.last_history_id += 1;
        let row = IpHistory {
            id: self.last_history_id,
            domain_id: new.domain_id,
            ip_address: new.ip_address,
            timestamp: new.timestamp,
            status: new.status,
            message: new.message,
        };
        self.history.push(row.clone());
        Ok(row)
    }

    /// Newest first: timestamp descending, ties broken by id descending
    pub(crate) fn history(&self, domain_id: DomainId, limit: Option<usize>) -> Vec<IpHistory> {
        let mut rows: Vec<IpHistory> = self
            .history
            .iter()
            .filter(|h| h.domain_id == domain_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        rows
    }

    pub(crate) fn count_history(&self, domain_id: DomainId) -> usize {
        self.history.iter().filter(|h| h.domain_id == domain_id).count()
    }

    pub(crate) fn delete_history_beyond(&mut self, domain_id: DomainId, keep: usize) -> usize {
        let doomed: HashSet<HistoryId> = self
            .history(domain_id, None)
            .into_iter()
            .skip(keep)
            .map(|h| h.id)
            .collect();
        if doomed.is_empty() {
            return 0;
        }
        self.history.retain(|h| !doomed.contains(&h.id));
        doomed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UpdateStatus;
    use chrono::{Duration, Utc};

    fn seeded() -> (Tables, Provider, Domain) {
        let mut tables = Tables::default();
        let provider = tables
            .insert_provider(NewProvider {
                name: "home".into(),
                kind: "duckdns".into(),
                credentials_encrypted: "blob".into(),
                is_enabled: true,
            })
            .unwrap();
        let domain = tables
            .insert_domain(NewDomain {
                provider_id: provider.id,
                domain_name: "home.duckdns.org".into(),
                ..Default::default()
            })
            .unwrap();
        (tables, provider, domain)
    }

    #[test]
    fn provider_names_are_unique() {
        let (mut tables, _, _) = seeded();
        let err = tables
            .insert_provider(NewProvider {
                name: "home".into(),
                kind: "dynu".into(),
                credentials_encrypted: String::new(),
                is_enabled: true,
            })
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn domain_requires_existing_provider() {
        let mut tables = Tables::default();
        let err = tables
            .insert_domain(NewDomain {
                provider_id: 42,
                domain_name: "x".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound(42)));
    }

    #[test]
    fn history_orders_newest_first_with_id_tie_break() {
        let (mut tables, _, domain) = seeded();
        let now = Utc::now();

        let mut older = NewHistory::new(domain.id, "1.1.1.1", UpdateStatus::Success, "a");
        older.timestamp = now - Duration::seconds(10);
        let mut tie_a = NewHistory::new(domain.id, "2.2.2.2", UpdateStatus::Success, "b");
        tie_a.timestamp = now;
        let mut tie_b = NewHistory::new(domain.id, "3.3.3.3", UpdateStatus::Failed, "c");
        tie_b.timestamp = now;

        tables.commit_attempt(older, None).unwrap();
        tables.commit_attempt(tie_a, None).unwrap();
        tables.commit_attempt(tie_b, None).unwrap();

        let ips: Vec<String> = tables
            .history(domain.id, None)
            .into_iter()
            .map(|h| h.ip_address)
            .collect();
        assert_eq!(ips, vec!["3.3.3.3", "2.2.2.2", "1.1.1.1"]);
    }

    #[test]
    fn delete_history_beyond_keeps_most_recent() {
        let (mut tables, _, domain) = seeded();
        for i in 0..25 {
            let row = NewHistory::new(domain.id, format!("10.0.0.{}", i), UpdateStatus::Success, "ok");
            tables.commit_attempt(row, None).unwrap();
        }

        assert_eq!(tables.delete_history_beyond(domain.id, 20), 5);
        assert_eq!(tables.count_history(domain.id), 20);
        assert_eq!(tables.delete_history_beyond(domain.id, 20), 0);

        let newest = tables.history(domain.id, Some(1));
        assert_eq!(newest[0].ip_address, "10.0.0.24");
    }

    #[test]
    fn commit_attempt_updates_status_fields() {
        let (mut tables, _, domain) = seeded();
        let row = NewHistory::new(domain.id, "5.5.5.5", UpdateStatus::Success, "ok");
        tables
            .commit_attempt(
                row,
                Some(StatusUpdate {
                    last_known_ip: Some("5.5.5.5".into()),
                    status: UpdateStatus::Success,
                }),
            )
            .unwrap();

        let failed = NewHistory::new(domain.id, "6.6.6.6", UpdateStatus::Failed, "no");
        tables
            .commit_attempt(
                failed,
                Some(StatusUpdate {
                    last_known_ip: None,
                    status: UpdateStatus::Failed,
                }),
            )
            .unwrap();

        let stored = tables.domain(domain.id).unwrap();
        assert_eq!(stored.last_known_ip.as_deref(), Some("5.5.5.5"));
        assert_eq!(stored.last_update_status, Some(UpdateStatus::Failed));
    }

    #[test]
    fn deleting_provider_cascades() {
        let (mut tables, provider, domain) = seeded();
        let row = NewHistory::new(domain.id, "1.2.3.4", UpdateStatus::Success, "ok");
        tables.commit_attempt(row, None).unwrap();

        assert!(tables.delete_provider(provider.id));
        assert!(tables.domain(domain.id).is_none());
        assert_eq!(tables.count_history(domain.id), 0);
        assert!(!tables.delete_provider(provider.id));
    }

    #[test]
    fn scheduled_domains_skip_blank_cron() {
        let (mut tables, provider, domain) = seeded();
        tables
            .set_cron_schedule(domain.id, Some("*/5 * * * *".into()))
            .unwrap();
        let blank = tables
            .insert_domain(NewDomain {
                provider_id: provider.id,
                domain_name: "other".into(),
                cron_schedule: Some("  ".into()),
                ..Default::default()
            })
            .unwrap();

        let scheduled: Vec<DomainId> = tables.scheduled_domains().iter().map(|d| d.id).collect();
        assert_eq!(scheduled, vec![domain.id]);
        assert_ne!(blank.id, domain.id);
    }
}
