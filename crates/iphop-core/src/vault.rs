//! AES-256-GCM credential vault
//!
//! Sealed format: `base64(nonce || ciphertext)` where the plaintext is the
//! JSON encoding of the credential map and the nonce is 12 random bytes.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;

use crate::error::{Error, Result};
use crate::model::Credentials;
use crate::traits::CredentialVault;

const NONCE_LENGTH: usize = 12;
const KEY_LENGTH: usize = 32;

/// Credential vault keyed by a 32-byte secret
pub struct AesGcmVault {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for AesGcmVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmVault")
            .field("key", &"<REDACTED>")
            .finish()
    }
}

impl AesGcmVault {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LENGTH {
            return Err(Error::config(format!(
                "Encryption key must be {} bytes, got {}",
                KEY_LENGTH,
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| Error::config(format!("Failed to create cipher: {}", e)))?;
        Ok(Self { cipher })
    }

    /// Build from a base64-encoded key
    pub fn from_base64(key_b64: &str) -> Result<Self> {
        let key = BASE64
            .decode(key_b64.trim())
            .map_err(|e| Error::config(format!("Encryption key is not valid base64: {}", e)))?;
        Self::new(&key)
    }

    /// Fresh random key, base64-encoded
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LENGTH];
        rand::rng().fill_bytes(&mut key);
        BASE64.encode(key)
    }
}

impl CredentialVault for AesGcmVault {
    fn encrypt(&self, credentials: &Credentials) -> Result<String> {
        let plaintext = serde_json::to_vec(credentials)?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_slice())
            .map_err(|e| Error::credentials(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    fn decrypt(&self, blob: &str) -> Result<Credentials> {
        let sealed = BASE64
            .decode(blob.trim())
            .map_err(|e| Error::credentials(format!("Invalid base64: {}", e)))?;
        if sealed.len() <= NONCE_LENGTH {
            return Err(Error::credentials("Sealed credentials are truncated"));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::credentials("Decryption failed (wrong key or tampered data)"))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| Error::credentials(format!("Decrypted credentials are not a map: {}", e)))
    }
}
