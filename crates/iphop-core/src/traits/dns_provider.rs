// # DNS Provider Trait
//
// Defines the interface for pushing an IPv4 address to a DNS vendor.
//
// ## Implementations
//
// - Dynu, Cloudflare, DuckDNS, No-IP: `iphop-providers` crate
//
// ## Usage
//
// ```rust,ignore
// use iphop_core::{DnsProvider, DomainTarget};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let target = DomainTarget::DuckDns { name: "home.duckdns.org".into() };
//
//     if !provider.update_record("203.0.113.7".parse()?, &target).await? {
//         println!("vendor rejected the update");
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::model::{Credentials, DomainTarget, ProviderKind};

/// Trait for DNS vendor adapters
///
/// Adapters are stateless and single-shot: one `update_record` call issues
/// at most one vendor request. Retry and scheduling belong to the caller.
///
/// # Outcome vocabulary
///
/// - `Ok(true)`: the vendor accepted the address
/// - `Ok(false)`: the vendor was reachable and rejected the update, or the
///   target lacks an identifier the vendor needs (no request is made)
/// - `Err(Error::Provider { .. })`: network failure, unparseable response,
///   banned client or account, missing credentials
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Publish `ip` as the A record for `target`
    async fn update_record(&self, ip: Ipv4Addr, target: &DomainTarget)
    -> Result<bool, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Builds the adapter for a vendor from decrypted credentials
///
/// Construction does no I/O. Missing credential keys are reported by the
/// adapter at call time, not here.
pub trait ProviderFactory: Send + Sync {
    fn create(
        &self,
        kind: ProviderKind,
        credentials: &Credentials,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
