//! Cloudflare adapter
//!
//! Overwrites one existing A record by id. Zone and record ids come from the
//! domain configuration; nothing is discovered through the API.

use async_trait::async_trait;
use iphop_core::model::DomainTarget;
use iphop_core::traits::DnsProvider;
use iphop_core::{Error, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::{http_client, network_error, wrong_target};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare's "automatic" TTL
const CLOUDFLARE_AUTO_TTL: u32 = 1;

/// Cloudflare DNS provider
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    pub fn new(api_token: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_token, CLOUDFLARE_API_BASE, timeout)
    }

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
        zone_id: &str,
        record_id: &str,
        name: &str,
        proxied: bool,
        ip: Ipv4Addr,
    ) -> Result<reqwest::Request> {
        let payload = serde_json::json!({
            "type": "A",
            "name": name,
            "content": ip.to_string(),
            "ttl": CLOUDFLARE_AUTO_TTL,
            "proxied": proxied,
        });

        self.client
            .put(format!(
                "{}/zones/{}/dns_records/{}",
                self.base_url, zone_id, record_id
            ))
            .bearer_auth(api_token)
            .json(&payload)
            .build()
            .map_err(|e| Error::provider("cloudflare", format!("Failed to build request: {}", e)))
    }

    /// Decide the outcome from the HTTP status and raw body
    ///
    /// The body must be JSON; success needs HTTP 200 and `success: true`.
    fn interpret(status: StatusCode, body: &str) -> Result<bool> {
        let json: Value = serde_json::from_str(body).map_err(|e| {
            Error::provider("cloudflare", format!("Failed to parse response: {}", e))
        })?;

        if status == StatusCode::OK && json["success"].as_bool() == Some(true) {
            return Ok(true);
        }

        let errors = json["errors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| format!("{}: {}", e["code"], e["message"].as_str().unwrap_or("")))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        tracing::error!("Cloudflare update failed (HTTP {}): {}", status, errors);
        Ok(false)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn update_record(&self, ip: Ipv4Addr, target: &DomainTarget) -> Result<bool> {
        let DomainTarget::Cloudflare {
            zone_id,
            record_id,
            name,
            proxied,
        } = target
        else {
            return Err(wrong_target("cloudflare", target));
        };

        let Some(api_token) = self.api_token.as_deref() else {
            tracing::error!("Cloudflare API token is missing");
            return Err(Error::provider("cloudflare", "Cloudflare API Token missing"));
        };

        let (Some(zone_id), Some(record_id)) = (zone_id.as_deref(), record_id.as_deref()) else {
            tracing::error!(
                "Cloudflare configuration incomplete for {}. zone_id and record_id are required.",
                name
            );
            return Ok(false);
        };

        tracing::info!("Updating Cloudflare record for {} to {}", name, ip);
        let request = self.build_request(api_token, zone_id, record_id, name, *proxied, ip)?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| network_error("cloudflare", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| network_error("cloudflare", e))?;

        let accepted = Self::interpret(status, &body)?;
        if accepted {
            tracing::info!("Cloudflare update successful: {}", ip);
        }
        Ok(accepted)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(token: Option<&str>) -> CloudflareProvider {
        CloudflareProvider::with_base_url(
            token.map(str::to_string),
            "http://127.0.0.1:1/client/v4/",
            Duration::from_secs(2),
        )
        .unwrap()
    }

    fn target(zone: Option<&str>, record: Option<&str>) -> DomainTarget {
        DomainTarget::Cloudflare {
            zone_id: zone.map(str::to_string),
            record_id: record.map(str::to_string),
            name: "home.example.com".into(),
            proxied: false,
        }
    }

    #[test]
    fn success_flag_decides() {
        assert!(CloudflareProvider::interpret(StatusCode::OK, r#"{"success":true,"errors":[]}"#).unwrap());

        let refused = r#"{"success":false,"errors":[{"code":81044,"message":"Record does not exist."}]}"#;
        assert!(!CloudflareProvider::interpret(StatusCode::OK, refused).unwrap());
        assert!(!CloudflareProvider::interpret(StatusCode::NOT_FOUND, refused).unwrap());
    }

    #[test]
    fn http_error_with_success_true_is_still_a_rejection() {
        assert!(
            !CloudflareProvider::interpret(StatusCode::FORBIDDEN, r#"{"success":true}"#).unwrap()
        );
    }

    #[test]
    fn unparseable_body_is_fatal() {
        assert!(CloudflareProvider::interpret(StatusCode::BAD_GATEWAY, "upstream reset").is_err());
    }

    #[test]
    fn request_targets_record_with_bearer_token() {
        let p = provider(Some("cf-token"));
        let request = p
            .build_request("cf-token", "zone1", "rec1", "home.example.com", true, Ipv4Addr::new(198, 51, 100, 4))
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::PUT);
        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:1/client/v4/zones/zone1/dns_records/rec1"
        );
        assert_eq!(request.headers()["authorization"], "Bearer cf-token");
        assert_eq!(request.headers()["content-type"], "application/json");

        let body: Value =
            serde_json::from_slice(request.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(body["type"], "A");
        assert_eq!(body["content"], "198.51.100.4");
        assert_eq!(body["ttl"], 1);
        assert_eq!(body["proxied"], true);
    }

    #[tokio::test]
    async fn missing_ids_return_false_without_request() {
        let p = provider(Some("t"));
        let ip = Ipv4Addr::new(1, 2, 3, 4);
        assert!(!p.update_record(ip, &target(None, Some("rec"))).await.unwrap());
        assert!(!p.update_record(ip, &target(Some("zone"), None)).await.unwrap());
    }

    #[tokio::test]
    async fn missing_token_is_fatal() {
        let err = provider(None)
            .update_record(Ipv4Addr::new(1, 2, 3, 4), &target(Some("z"), Some("r")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cloudflare API Token missing"));
    }

    #[tokio::test]
    async fn network_failure_is_fatal() {
        let err = provider(Some("t"))
            .update_record(Ipv4Addr::new(1, 2, 3, 4), &target(Some("z"), Some("r")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { ref provider, .. } if provider == "cloudflare"));
    }

    #[test]
    fn api_token_not_exposed_in_debug() {
        let debug = format!("{:?}", provider(Some("secret_token_12345")));
        assert!(!debug.contains("secret_token"));
        assert!(debug.contains("CloudflareProvider"));
    }
}
