//! DuckDNS adapter

use async_trait::async_trait;
use iphop_core::model::DomainTarget;
use iphop_core::traits::DnsProvider;
use iphop_core::{Error, Result};
use reqwest::StatusCode;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::{http_client, network_error, wrong_target};

const DEFAULT_BASE_URL: &str = "https://www.duckdns.org";

const DUCKDNS_SUFFIX: &str = ".duckdns.org";

pub struct DuckDnsProvider {
    /// ⚠️ NEVER log this value (it also travels in the query string)
    token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for DuckDnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDnsProvider")
            .field("token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DuckDnsProvider {
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL, timeout)
    }

    /// Create with custom base URL (for testing)
    pub fn with_base_url(
        token: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            token: token.filter(|t| !t.is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }

    /// `foo.duckdns.org` and `foo` both mean subdomain `foo`
    pub fn subdomain(domain_name: &str) -> &str {
        domain_name
            .strip_suffix(DUCKDNS_SUFFIX)
            .unwrap_or(domain_name)
    }

    fn build_request(&self, token: &str, subdomain: &str, ip: Ipv4Addr) -> Result<reqwest::Request> {
        let ip = ip.to_string();
        self.client
            .get(format!("{}/update", self.base_url))
            .query(&[
                ("domains", subdomain),
                ("token", token),
                ("ip", ip.as_str()),
                ("verbose", "true"),
            ])
            .build()
            .map_err(|e| Error::provider("duckdns", format!("Failed to build request: {}", e)))
    }

    /// `OK...` on HTTP 200 is success; anything else is a rejection
    fn interpret(status: StatusCode, body: &str) -> bool {
        let text = body.trim();
        if status != StatusCode::OK {
            tracing::error!("DuckDNS HTTP error {}", status);
            return false;
        }
        if text.starts_with("OK") {
            return true;
        }
        if text == "KO" {
            tracing::error!("DuckDNS update failed: invalid token or domain");
        } else {
            tracing::error!("DuckDNS unexpected response: {}", text);
        }
        false
    }
}

#[async_trait]
impl DnsProvider for DuckDnsProvider {
    async fn update_record(&self, ip: Ipv4Addr, target: &DomainTarget) -> Result<bool> {
        let DomainTarget::DuckDns { name } = target else {
            return Err(wrong_target("duckdns", target));
        };

        let Some(token) = self.token.as_deref() else {
            tracing::error!("DuckDNS token is missing");
            return Err(Error::provider("duckdns", "DuckDNS token missing"));
        };

        let subdomain = Self::subdomain(name);
        if subdomain.is_empty() {
            tracing::error!("DuckDNS subdomain is empty for {}", name);
            return Ok(false);
        }

        tracing::info!("Updating DuckDNS subdomain {} to {}", subdomain, ip);
        let request = self.build_request(token, subdomain, ip)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| network_error("duckdns", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| network_error("duckdns", e))?;

        let accepted = Self::interpret(status, &body);
        if accepted {
            tracing::info!("DuckDNS update successful: {}", ip);
        }
        Ok(accepted)
    }

    fn provider_name(&self) -> &'static str {
        "duckdns"
    }
}
