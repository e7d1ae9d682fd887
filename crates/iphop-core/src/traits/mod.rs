//! Core traits for ip-hop
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Discover the public IPv4 address
//! - [`DnsProvider`]: Push an address to a DNS vendor
//! - [`Store`]: Providers, domains and update history
//! - [`CredentialVault`]: Encrypt and decrypt provider credentials

pub mod ip_resolver;
pub mod dns_provider;
pub mod store;
pub mod credential_vault;

pub use ip_resolver::IpResolver;
pub use dns_provider::{DnsProvider, ProviderFactory};
pub use store::Store;
pub use credential_vault::CredentialVault;
