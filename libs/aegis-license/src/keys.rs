use std::fmt;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::DecodingKey;

use crate::config::TrustedKeyConfig;
use crate::errors::KeyError;

/// Ed25519 public key of the Aegis license issuer (raw 32 bytes, base64url).
pub const EMBEDDED_PUBLIC_KEY: &str = "kmwtGk_y4aNT5IzBqD1GvdaPZeNqUHeM0WZPdVd-nFw";

const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Public key that token signatures are verified against.
#[derive(Clone)]
pub struct TrustedKey {
    key: DecodingKey,
    source: &'static str,
}

impl TrustedKey {
    /// Resolve the key described by `config`.
    ///
    /// # Errors
    /// Returns `KeyError` if the key material is unreadable or not an Ed25519 public key.
    pub fn from_config(config: &TrustedKeyConfig) -> Result<Self, KeyError> {
        match config {
            TrustedKeyConfig::Embedded => Self::embedded(),
            TrustedKeyConfig::Base64Url { key } => Self::from_base64url(key),
            TrustedKeyConfig::PemFile { path } => Self::from_pem_file(path),
        }
    }

    /// The compiled-in issuer key.
    ///
    /// # Errors
    /// Returns `KeyError::InvalidKey` if the embedded constant is corrupt.
    pub fn embedded() -> Result<Self, KeyError> {
        let mut key = Self::from_base64url(EMBEDDED_PUBLIC_KEY)?;
        key.source = "embedded";
        Ok(key)
    }

    /// Raw 32-byte Ed25519 key encoded as base64url without padding.
    ///
    /// # Errors
    /// Returns `KeyError::InvalidKey` on bad encoding or wrong length.
    pub fn from_base64url(encoded: &str) -> Result<Self, KeyError> {
        let encoded = encoded.trim();
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| KeyError::InvalidKey(format!("not base64url: {e}")))?;
        if bytes.len() != ED25519_PUBLIC_KEY_LEN {
            return Err(KeyError::InvalidKey(format!(
                "expected {ED25519_PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let key = DecodingKey::from_ed_components(encoded)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self {
            key,
            source: "base64url",
        })
    }

    /// SPKI PEM (`BEGIN PUBLIC KEY`) holding an Ed25519 key.
    ///
    /// # Errors
    /// Returns `KeyError::InvalidKey` if the PEM does not contain an Ed25519 key.
    pub fn from_pem(pem: &[u8]) -> Result<Self, KeyError> {
        let key = DecodingKey::from_ed_pem(pem).map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self { key, source: "pem" })
    }

    /// Read and parse a PEM key file.
    ///
    /// # Errors
    /// Returns `KeyError::KeyFile` if the file cannot be read, or `KeyError::InvalidKey`.
    pub fn from_pem_file(path: &Path) -> Result<Self, KeyError> {
        let pem = std::fs::read(path).map_err(|source| KeyError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(&pem)
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }

    /// Where the key came from, for logging.
    #[must_use]
    pub fn source(&self) -> &'static str {
        self.source
    }
}

impl fmt::Debug for TrustedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedKey")
            .field("algorithm", &"EdDSA")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
