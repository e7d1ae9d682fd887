//! Test doubles and common utilities for contract tests
//!
//! The doubles count their calls so tests can assert that a vendor was (or
//! was not) contacted without any network I/O.

#![allow(dead_code)]

use iphop_core::error::{Error, Result};
use iphop_core::model::{
    Credentials, Domain, DomainTarget, NewDomain, NewProvider, Provider, ProviderKind,
};
use iphop_core::traits::{CredentialVault, DnsProvider, IpResolver, ProviderFactory, Store};
use iphop_core::{MemoryStore, UpdateOrchestrator};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A resolver whose answer the test controls
#[derive(Clone)]
pub struct MockResolver {
    ip: Arc<std::sync::Mutex<Option<Ipv4Addr>>>,
    call_count: Arc<AtomicUsize>,
}

impl MockResolver {
    pub fn returning(ip: Ipv4Addr) -> Self {
        Self {
            ip: Arc::new(std::sync::Mutex::new(Some(ip))),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            ip: Arc::new(std::sync::Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_ip(&self, ip: Ipv4Addr) {
        *self.ip.lock().unwrap() = Some(ip);
    }

    pub fn fail(&self) {
        *self.ip.lock().unwrap() = None;
    }

    /// Get the number of times resolve() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for MockResolver {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let ip = *self.ip.lock().unwrap();
        ip.ok_or_else(|| {
            Error::ip_fetch("All IP fetch attempts failed. Details: mock://echo: unreachable")
        })
    }
}

/// What the mock adapter answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    Accept,
    Reject,
    Fail,
}

/// A mock DnsProvider that tracks calls
#[derive(Clone)]
pub struct MockProvider {
    outcome: Arc<std::sync::Mutex<MockOutcome>>,
    delay: Duration,
    update_call_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<std::sync::Mutex<Vec<(Ipv4Addr, DomainTarget)>>>,
}

impl MockProvider {
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome: Arc::new(std::sync::Mutex::new(outcome)),
            delay: Duration::ZERO,
            update_call_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Hold each call open for `delay` so overlapping calls are observable
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_outcome(&self, outcome: MockOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Highest number of update_record() calls running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(Ipv4Addr, DomainTarget)> {
        self.calls.lock().unwrap().clone()
    }

    /// Create a new MockProvider that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        other.clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockProvider {
    async fn update_record(&self, ip: Ipv4Addr, target: &DomainTarget) -> Result<bool> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push((ip, target.clone()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let outcome = *self.outcome.lock().unwrap();
        match outcome {
            MockOutcome::Accept => Ok(true),
            MockOutcome::Reject => Ok(false),
            MockOutcome::Fail => Err(Error::provider("mock", "Authentication failed")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory handing out adapters that share one MockProvider's counters
pub struct MockFactory {
    provider: MockProvider,
    create_call_count: Arc<AtomicUsize>,
}

impl MockFactory {
    pub fn new(provider: &MockProvider) -> Self {
        Self {
            provider: MockProvider::sharing_counters_with(provider),
            create_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for MockFactory {
    fn create(
        &self,
        _kind: ProviderKind,
        _credentials: &Credentials,
    ) -> Result<Box<dyn DnsProvider>> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockProvider::sharing_counters_with(&self.provider)))
    }
}

/// Vault that stores credentials as plain JSON
pub struct PlainVault;

impl CredentialVault for PlainVault {
    fn encrypt(&self, credentials: &Credentials) -> Result<String> {
        Ok(serde_json::to_string(credentials)?)
    }

    fn decrypt(&self, blob: &str) -> Result<Credentials> {
        serde_json::from_str(blob).map_err(|e| Error::credentials(e.to_string()))
    }
}

/// Everything a contract test needs, wired over a MemoryStore
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub resolver: MockResolver,
    pub provider: MockProvider,
    pub factory: Arc<MockFactory>,
    pub orchestrator: Arc<UpdateOrchestrator>,
}

impl Harness {
    pub fn new(ip: Ipv4Addr, outcome: MockOutcome) -> Self {
        Self::with_parts(MockResolver::returning(ip), MockProvider::new(outcome))
    }

    pub fn with_parts(resolver: MockResolver, provider: MockProvider) -> Self {
        let store = Arc::new(MemoryStore::new());
        let factory = Arc::new(MockFactory::new(&provider));
        let orchestrator = Arc::new(UpdateOrchestrator::new(
            store.clone(),
            Arc::new(resolver.clone()),
            factory.clone(),
            Arc::new(PlainVault),
        ));
        Self {
            store,
            resolver,
            provider,
            factory,
            orchestrator,
        }
    }

    pub async fn add_provider(&self, name: &str, kind: &str, enabled: bool) -> Provider {
        let credentials = Credentials::new().with("token", "test-token");
        self.store
            .insert_provider(NewProvider {
                name: name.to_string(),
                kind: kind.to_string(),
                credentials_encrypted: PlainVault.encrypt(&credentials).unwrap(),
                is_enabled: enabled,
            })
            .await
            .unwrap()
    }

    pub async fn add_domain(&self, provider: &Provider, name: &str) -> Domain {
        self.store
            .insert_domain(NewDomain {
                provider_id: provider.id,
                domain_name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    /// One enabled DuckDNS provider with one domain
    pub async fn seeded(&self) -> Domain {
        let provider = self.add_provider("home", "duckdns", true).await;
        self.add_domain(&provider, "home.duckdns.org").await
    }

    pub async fn domain(&self, domain: &Domain) -> Domain {
        self.store.get_domain(domain.id).await.unwrap().unwrap()
    }
}

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}
