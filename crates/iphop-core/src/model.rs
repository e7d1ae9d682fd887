//! Domain model
//!
//! Rows held by the store ([`Provider`], [`Domain`], [`IpHistory`]) and the
//! per-vendor view of a domain handed to adapters ([`DomainTarget`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Domain primary key
pub type DomainId = i64;

/// Provider primary key
pub type ProviderId = i64;

/// History row primary key
pub type HistoryId = i64;

/// Supported DNS vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Dynu,
    Cloudflare,
    DuckDns,
    NoIp,
}

impl ProviderKind {
    /// Every supported vendor, in display order
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Dynu,
        ProviderKind::Cloudflare,
        ProviderKind::DuckDns,
        ProviderKind::NoIp,
    ];

    /// Type tag as stored on the provider row
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Dynu => "dynu",
            ProviderKind::Cloudflare => "cloudflare",
            ProviderKind::DuckDns => "duckdns",
            ProviderKind::NoIp => "noip",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| Error::UnknownProviderKind(s.to_string()))
    }
}

/// Outcome recorded for an update attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateStatus {
    Success,
    Failed,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Success => "SUCCESS",
            UpdateStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured DNS vendor account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    /// Unique display name
    pub name: String,
    /// Raw type tag, parsed with [`Provider::kind`]
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque blob produced by a [`CredentialVault`](crate::traits::CredentialVault)
    pub credentials_encrypted: String,
    pub is_enabled: bool,
}

impl Provider {
    /// Parse the stored type tag
    pub fn kind(&self) -> Result<ProviderKind> {
        self.kind.parse()
    }
}

/// Insert payload for a provider
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub kind: String,
    pub credentials_encrypted: String,
    pub is_enabled: bool,
}

/// A managed DNS name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub provider_id: ProviderId,
    pub domain_name: String,
    /// Vendor-side identifier (Dynu numeric domain id)
    #[serde(default)]
    pub external_id: Option<String>,
    /// Vendor-specific flags (`proxied`, `zone_id`, `record_id`, ...)
    #[serde(default)]
    pub config: HashMap<String, Value>,
    #[serde(default)]
    pub last_known_ip: Option<String>,
    #[serde(default)]
    pub last_update_status: Option<UpdateStatus>,
    #[serde(default)]
    pub cron_schedule: Option<String>,
}

impl Domain {
    fn config_str(&self, key: &str) -> Option<String> {
        match self.config.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn config_flag(&self, key: &str) -> bool {
        match self.config.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Insert payload for a domain
#[derive(Debug, Clone, Default)]
pub struct NewDomain {
    pub provider_id: ProviderId,
    pub domain_name: String,
    pub external_id: Option<String>,
    pub config: HashMap<String, Value>,
    pub cron_schedule: Option<String>,
}

/// One update attempt, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpHistory {
    pub id: HistoryId,
    pub domain_id: DomainId,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
    pub status: UpdateStatus,
    pub message: Option<String>,
}

/// Insert payload for a history row
#[derive(Debug, Clone)]
pub struct NewHistory {
    pub domain_id: DomainId,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
    pub status: UpdateStatus,
    pub message: Option<String>,
}

impl NewHistory {
    pub fn new(
        domain_id: DomainId,
        ip_address: impl Into<String>,
        status: UpdateStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            domain_id,
            ip_address: ip_address.into(),
            timestamp: Utc::now(),
            status,
            message: Some(message.into()),
        }
    }
}

/// Domain fields rewritten together with a history row
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// New last-known IP; `None` leaves the stored value untouched
    pub last_known_ip: Option<String>,
    pub status: UpdateStatus,
}

/// Decrypted provider credentials
///
/// Keys are `token` for Dynu, Cloudflare and DuckDNS; `username` and
/// `password` for No-IP. Values never appear in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(HashMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Non-empty value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.0.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Credentials")
            .field("keys", &keys)
            .field("values", &"<REDACTED>")
            .finish()
    }
}

impl From<HashMap<String, String>> for Credentials {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

/// Vendor-specific identity of a domain for one update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainTarget {
    Dynu {
        domain_id: Option<String>,
        name: String,
    },
    Cloudflare {
        zone_id: Option<String>,
        record_id: Option<String>,
        name: String,
        proxied: bool,
    },
    DuckDns {
        name: String,
    },
    NoIp {
        hostname: String,
    },
}

impl DomainTarget {
    /// Build the target for `kind` from the stored domain fields
    pub fn for_domain(kind: ProviderKind, domain: &Domain) -> Self {
        let name = domain.domain_name.trim().to_string();
        let external_id = domain
            .external_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        match kind {
            ProviderKind::Dynu => DomainTarget::Dynu {
                domain_id: external_id,
                name,
            },
            ProviderKind::Cloudflare => {
                let zone_id = domain.config_str("zone_id").or_else(|| {
                    if external_id.is_some() {
                        tracing::warn!(
                            "Domain {} has no config.zone_id, using external_id as the Cloudflare zone",
                            domain.id
                        );
                    }
                    external_id
                });
                DomainTarget::Cloudflare {
                    zone_id,
                    record_id: domain.config_str("record_id"),
                    name,
                    proxied: domain.config_flag("proxied"),
                }
            }
            ProviderKind::DuckDns => DomainTarget::DuckDns { name },
            ProviderKind::NoIp => DomainTarget::NoIp { hostname: name },
        }
    }

    /// Vendor this target belongs to
    pub fn kind(&self) -> ProviderKind {
        match self {
            DomainTarget::Dynu { .. } => ProviderKind::Dynu,
            DomainTarget::Cloudflare { .. } => ProviderKind::Cloudflare,
            DomainTarget::DuckDns { .. } => ProviderKind::DuckDns,
            DomainTarget::NoIp { .. } => ProviderKind::NoIp,
        }
    }

    /// DNS name being updated
    pub fn name(&self) -> &str {
        match self {
            DomainTarget::Dynu { name, .. }
            | DomainTarget::Cloudflare { name, .. }
            | DomainTarget::DuckDns { name } => name,
            DomainTarget::NoIp { hostname } => hostname,
        }
    }
}
