//! Per-domain update locks
//!
//! Updates for the same domain serialize; different domains never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::DomainId;

/// Per-key async mutex keyed by domain id
#[derive(Debug, Clone, Default)]
pub struct DomainLocks {
    locks: Arc<Mutex<HashMap<DomainId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for `domain_id`
    pub fn get(&self, domain_id: DomainId) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(domain_id).or_default().clone()
    }

    /// Drop the lock for a deleted domain
    ///
    /// A lock still held or awaited elsewhere stays alive through its other
    /// references; only the map entry goes away.
    pub fn forget(&self, domain_id: DomainId) {
        let mut map = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.remove(&domain_id);
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
