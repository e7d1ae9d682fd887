// # iphop-core
//
// Core library for ip-hop, a dynamic DNS updater that keeps A records at
// several vendors pointed at the host's public IPv4 address.
//
// ## Architecture Overview
//
// - **IpResolver**: Trait for discovering the public IPv4 address
// - **DnsProvider**: Trait for pushing an address to one DNS vendor
// - **Store**: Trait over providers, domains and update history
// - **CredentialVault**: Trait for sealing provider credentials
// - **UpdateOrchestrator**: One update attempt, history and retention
// - **ScheduleManager**: One cron timer per domain, change-gated updates
// - **IpHop**: Caller-facing operations over the two above
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from vendor and transport code
// 2. **Explicit Lifecycle**: The scheduler is constructed and shut down by its owner
// 3. **Exhaustive Dispatch**: Vendors are an enum, matched at adapter construction
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Bounded History**: At most twenty history rows per domain

pub mod traits;
pub mod engine;
pub mod scheduler;
pub mod service;
pub mod config;
pub mod error;
pub mod model;
pub mod state;
pub mod vault;

// Re-export core types for convenience
pub use traits::{CredentialVault, DnsProvider, IpResolver, ProviderFactory, Store};
pub use engine::{HISTORY_RETENTION, UpdateOrchestrator};
pub use scheduler::{ScheduleManager, TickOutcome};
pub use service::IpHop;
pub use config::{IpHopConfig, ProviderHttpConfig, ResolverConfig, StoreConfig};
pub use error::{Error, Result};
pub use model::{
    Credentials, Domain, DomainId, DomainTarget, IpHistory, Provider, ProviderId, ProviderKind,
    UpdateStatus,
};
pub use state::{FileStore, MemoryStore};
pub use vault::AesGcmVault;
