//! Error types for ip-hop
//!
//! This module defines all error types used throughout the workspace.

use crate::model::{DomainId, ProviderId};
use thiserror::Error;

/// Result type alias for ip-hop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ip-hop
#[derive(Error, Debug)]
pub enum Error {
    /// Every configured IP-echo endpoint failed or returned garbage
    #[error("{0}")]
    IpFetch(String),

    /// Fatal vendor-side condition (network failure, banned client, bad credentials)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Domain does not exist in the store
    #[error("Domain not found: {0}")]
    DomainNotFound(DomainId),

    /// Domain references a provider that does not exist
    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderId),

    /// Owning provider is disabled; no update may be attempted
    #[error("Provider is disabled: {0}")]
    ProviderDisabled(String),

    /// Stored provider type tag does not name a supported vendor
    #[error("Unknown provider type: {0}")]
    UnknownProviderKind(String),

    /// Store-related errors
    #[error("Store error: {0}")]
    Store(String),

    /// Credential encryption/decryption errors
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cron expression rejected by the parser
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron {
        /// The rejected expression
        expression: String,
        /// Parser message
        reason: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an IP fetch error
    pub fn ip_fetch(msg: impl Into<String>) -> Self {
        Self::IpFetch(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a credential error
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid cron error
    pub fn invalid_cron(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCron {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Errors caused by the state of the caller's data rather than by I/O.
    ///
    /// An HTTP layer maps these to 4xx-style responses.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::DomainNotFound(_)
                | Self::ProviderNotFound(_)
                | Self::ProviderDisabled(_)
                | Self::UnknownProviderKind(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
