//! Dynu adapter
//!
//! POSTs the full record body to `/v2/dns/{id}` with the `API-Key` header.
//! The record id is the domain's external id.

use async_trait::async_trait;
use iphop_core::model::DomainTarget;
use iphop_core::traits::DnsProvider;
use iphop_core::{Error, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::{http_client, network_error, wrong_target};

const DYNU_API_BASE: &str = "https://api.dynu.com/v2/dns";

/// Record TTL sent with every update (seconds)
const DYNU_TTL: u32 = 90;

pub struct DynuProvider {
    /// ⚠️ NEVER log this value
    api_token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for DynuProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynuProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DynuProvider {
    pub fn new(api_token: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_token, DYNU_API_BASE, timeout)
    }

    /// Point the adapter at another API root (tests, mirrors)
    pub fn with_base_url(
        api_token: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_token: api_token.filter(|t| !t.is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }

    fn build_request(
        &self,
        api_token: &str,
        record_id: &str,
        name: &str,
        ip: Ipv4Addr,
    ) -> Result<reqwest::Request> {
        let payload = serde_json::json!({
            "name": name,
            "group": "",
            "ipv4Address": ip.to_string(),
            "ipv6Address": null,
            "ttl": DYNU_TTL,
            "ipv4": true,
            "ipv6": false,
            "ipv4WildcardAlias": true,
            "ipv6WildcardAlias": false,
            "allowZoneTransfer": false,
            "dnssec": true,
        });

        self.client
            .post(format!("{}/{}", self.base_url, record_id))
            .header("accept", "application/json")
            .header("API-Key", api_token)
            .json(&payload)
            .build()
            .map_err(|e| Error::provider("dynu", format!("Failed to build request: {}", e)))
    }

    /// Decide the outcome from the HTTP status and raw body
    ///
    /// The body must be JSON; success needs HTTP 200 and `statusCode == 200`.
    fn interpret(status: StatusCode, body: &str) -> Result<bool> {
        let json: Value = serde_json::from_str(body)
            .map_err(|e| Error::provider("dynu", format!("Failed to parse response: {}", e)))?;

        if status == StatusCode::OK && json["statusCode"].as_i64() == Some(200) {
            return Ok(true);
        }

        tracing::error!(
            "Dynu update failed: status {}, type {}, message {}",
            json["statusCode"],
            json["type"],
            json["message"]
        );
        Ok(false)
    }
}

#[async_trait]
impl DnsProvider for DynuProvider {
    async fn update_record(&self, ip: Ipv4Addr, target: &DomainTarget) -> Result<bool> {
        let DomainTarget::Dynu { domain_id, name } = target else {
            return Err(wrong_target("dynu", target));
        };

        let Some(api_token) = self.api_token.as_deref() else {
            tracing::error!("Dynu API token is missing");
            return Err(Error::provider("dynu", "Dynu API Token missing"));
        };

        let record_id = match domain_id.as_deref() {
            Some(id) if !name.is_empty() => id,
            _ => {
                tracing::error!(
                    "Dynu configuration incomplete for domain {}. ID is required.",
                    name
                );
                return Ok(false);
            }
        };

        tracing::info!("Updating Dynu record for {} to {}", name, ip);
        let request = self.build_request(api_token, record_id, name, ip)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| network_error("dynu", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| network_error("dynu", e))?;

        let accepted = Self::interpret(status, &body)?;
        if accepted {
            tracing::info!("Dynu update successful: {}", ip);
        }
        Ok(accepted)
    }

    fn provider_name(&self) -> &'static str {
        "dynu"
    }
}
