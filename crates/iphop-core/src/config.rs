//! Configuration types for ip-hop
//!
//! This module defines all configuration structures used throughout the workspace.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public IP-echo endpoints, queried in order
pub const DEFAULT_IP_ENDPOINTS: &[&str] = &[
    "https://checkip.amazonaws.com/",
    "https://icanhazip.com/",
    "https://ifconfig.me/ip",
    "https://api.ipify.org",
    "https://ipecho.net/plain",
];

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpHopConfig {
    /// Public IP resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Outbound settings shared by the vendor adapters
    #[serde(default)]
    pub provider: ProviderHttpConfig,

    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

impl IpHopConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.resolver.validate()?;
        self.provider.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// IP resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Echo endpoints, tried in order until one returns a valid IPv4
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_resolver_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per endpoint on transient failures
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.endpoints.is_empty() {
            return Err(crate::Error::config("At least one IP endpoint is required"));
        }
        for url in &self.endpoints {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "IP endpoint must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }
        if !(1..=60).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "Resolver timeout must be between 1 and 60 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        if !(1..=10).contains(&self.max_attempts) {
            return Err(crate::Error::config(format!(
                "Resolver attempts must be between 1 and 10. Got: {}",
                self.max_attempts
            )));
        }
        if self.retry_delay_secs > 60 {
            return Err(crate::Error::config(format!(
                "Resolver retry delay must be at most 60 seconds. Got: {}",
                self.retry_delay_secs
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            timeout_secs: default_resolver_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_endpoints() -> Vec<String> {
    DEFAULT_IP_ENDPOINTS.iter().map(|s| s.to_string()).collect()
}

fn default_resolver_timeout_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

/// Vendor adapter HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHttpConfig {
    /// Per-request timeout for vendor calls (in seconds)
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderHttpConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=120).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "Provider timeout must be between 1 and 120 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderHttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_provider_timeout_secs() -> u64 {
    10
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON file with atomic writes and backup recovery
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = IpHopConfig::default();
        assert_eq!(config.resolver.endpoints.len(), 5);
        assert_eq!(config.resolver.endpoints[0], "https://checkip.amazonaws.com/");
        assert_eq!(config.resolver.timeout(), Duration::from_secs(5));
        assert_eq!(config.resolver.max_attempts, 3);
        assert_eq!(config.resolver.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.provider.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: IpHopConfig = serde_json::from_str(
            r#"{"resolver": {"max_attempts": 1}, "store": {"type": "file", "path": "/tmp/s.json"}}"#,
        )
        .unwrap();
        assert_eq!(config.resolver.max_attempts, 1);
        assert_eq!(config.resolver.timeout_secs, 5);
        assert!(matches!(config.store, StoreConfig::File { .. }));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut resolver = ResolverConfig::default();
        resolver.endpoints.clear();
        assert!(resolver.validate().is_err());

        let mut resolver = ResolverConfig::default();
        resolver.endpoints = vec!["ftp://example.com".into()];
        assert!(resolver.validate().is_err());

        let mut resolver = ResolverConfig::default();
        resolver.max_attempts = 0;
        assert!(resolver.validate().is_err());

        let provider = ProviderHttpConfig { timeout_secs: 0 };
        assert!(provider.validate().is_err());

        let store = StoreConfig::File { path: " ".into() };
        assert!(store.validate().is_err());
    }
}
