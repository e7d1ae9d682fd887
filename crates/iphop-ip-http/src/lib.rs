// # HTTP IP Resolver
//
// Discovers the host's public IPv4 address by asking plain-text echo
// services ("what is my IP") in a fixed order.
//
// ## Failure Handling
//
// - Transient failures (connect errors, timeouts, non-2xx status, unreadable
//   body) are retried against the same endpoint with a fixed delay
// - A body that is not an IPv4 address is not retried; the next endpoint is
//   tried instead
// - When every endpoint fails, one error lists each endpoint's last failure

use iphop_core::config::ResolverConfig;
use iphop_core::traits::IpResolver;
use iphop_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

/// Transport seam for echo requests
///
/// `Err` means a transient failure; the resolver retries it.
#[async_trait::async_trait]
pub trait EchoClient: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, String>;
}

/// reqwest-backed echo client
#[derive(Debug, Clone)]
pub struct ReqwestEchoClient {
    client: reqwest::Client,
}

impl ReqwestEchoClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl EchoClient for ReqwestEchoClient {
    async fn fetch(&self, url: &str) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))
    }
}

/// Ordered multi-endpoint IPv4 resolver
pub struct HttpIpResolver<C: EchoClient = ReqwestEchoClient> {
    endpoints: Vec<String>,
    max_attempts: u32,
    retry_delay: Duration,
    client: C,
}

impl HttpIpResolver<ReqwestEchoClient> {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;
        let client = ReqwestEchoClient::new(config.timeout())?;
        Ok(Self::with_client(config, client))
    }
}

impl<C: EchoClient> HttpIpResolver<C> {
    pub fn with_client(config: &ResolverConfig, client: C) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
            client,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Fetch one endpoint, retrying transient failures
    async fn fetch_with_retry(&self, url: &str) -> std::result::Result<String, String> {
        let mut attempt = 1;
        loop {
            match self.client.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.max_attempts => {
                    tracing::debug!(
                        "Attempt {}/{} against {} failed: {}",
                        attempt,
                        self.max_attempts,
                        url,
                        e
                    );
                    attempt += 1;
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait::async_trait]
impl<C: EchoClient> IpResolver for HttpIpResolver<C> {
    async fn resolve(&self) -> Result<Ipv4Addr> {
        let mut failures = Vec::with_capacity(self.endpoints.len());

        for url in &self.endpoints {
            tracing::debug!("Attempting to fetch IP from {}", url);
            match self.fetch_with_retry(url).await {
                Ok(body) => {
                    let text = body.trim();
                    match text.parse::<Ipv4Addr>() {
                        Ok(ip) => {
                            tracing::info!("Fetched public IP {} from {}", ip, url);
                            return Ok(ip);
                        }
                        Err(_) => {
                            tracing::warn!("Invalid IP response from {}: {}", url, text);
                            failures.push(format!("{}: Invalid IP", url));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch IP from {}: {}", url, e);
                    failures.push(format!("{}: {}", url, e));
                }
            }
        }

        let message = format!(
            "All IP fetch attempts failed. Details: {}",
            failures.join("; ")
        );
        tracing::error!("{}", message);
        Err(Error::ip_fetch(message))
    }
}
