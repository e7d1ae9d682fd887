// # DNS Vendor Adapters
//
// One adapter per supported vendor, each pushing an IPv4 address to a single
// record with one HTTP request.
//
// ## Outcome Contract
//
// - `Ok(true)`: the vendor accepted the address
// - `Ok(false)`: the vendor was reachable but refused, or the domain lacks an
//   identifier the vendor needs (no request is sent in that case)
// - `Err(Error::Provider)`: missing credentials, network failure, unreadable
//   response, or a vendor answer that means the account itself is unusable
//
// ## Security Requirements
//
// - Tokens and passwords never appear in logs or `Debug` output
// - Credentials are checked before any request is sent
//
// ## API Reference
//
// - Dynu: POST `/v2/dns/:id`
// - Cloudflare API v4: PUT `/zones/:zone_id/dns_records/:record_id`
// - DuckDNS: GET `/update?domains=&token=&ip=`
// - No-IP: GET `/nic/update?hostname=&myip=`

mod cloudflare;
mod duckdns;
mod dynu;
mod noip;

pub use cloudflare::CloudflareProvider;
pub use duckdns::DuckDnsProvider;
pub use dynu::DynuProvider;
pub use noip::NoIpProvider;

use iphop_core::config::ProviderHttpConfig;
use iphop_core::model::{Credentials, DomainTarget, ProviderKind};
use iphop_core::traits::{DnsProvider, ProviderFactory};
use iphop_core::{Error, Result};
use std::time::Duration;

/// Build the HTTP client shared by one adapter instance
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

/// Adapter was handed another vendor's target
pub(crate) fn wrong_target(provider: &str, target: &DomainTarget) -> Error {
    Error::provider(
        provider,
        format!("Cannot update a {} target", target.kind()),
    )
}

/// Transport failure, with the URL (and any token in its query) stripped
pub(crate) fn network_error(provider: &str, e: reqwest::Error) -> Error {
    Error::provider(provider, format!("Network error: {}", e.without_url()))
}

/// Builds vendor adapters from decrypted credentials
///
/// Dynu, Cloudflare and DuckDNS read the `token` credential; No-IP reads
/// `username` and `password`. A missing credential is not a construction
/// error: the adapter fails on first use without sending a request.
#[derive(Debug, Clone, Default)]
pub struct VendorFactory {
    http: ProviderHttpConfig,
}

impl VendorFactory {
    pub fn new(http: ProviderHttpConfig) -> Self {
        Self { http }
    }
}

impl ProviderFactory for VendorFactory {
    fn create(&self, kind: ProviderKind, credentials: &Credentials) -> Result<Box<dyn DnsProvider>> {
        let timeout = self.http.timeout();
        let token = credentials.get("token").map(str::to_string);

        let provider: Box<dyn DnsProvider> = match kind {
            ProviderKind::Dynu => Box::new(DynuProvider::new(token, timeout)?),
            ProviderKind::Cloudflare => Box::new(CloudflareProvider::new(token, timeout)?),
            ProviderKind::DuckDns => Box::new(DuckDnsProvider::new(token, timeout)?),
            ProviderKind::NoIp => Box::new(NoIpProvider::new(
                credentials.get("username").map(str::to_string),
                credentials.get("password").map(str::to_string),
                timeout,
            )?),
        };
        Ok(provider)
    }
}
