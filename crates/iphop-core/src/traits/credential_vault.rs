//! Credential vault trait
//!
//! Providers store their credentials as an opaque string; the vault turns
//! that string into a [`Credentials`] map and back.

use crate::model::Credentials;

/// Symmetric encryption of provider credentials
pub trait CredentialVault: Send + Sync {
    fn encrypt(&self, credentials: &Credentials) -> Result<String, crate::Error>;

    fn decrypt(&self, blob: &str) -> Result<Credentials, crate::Error>;
}
