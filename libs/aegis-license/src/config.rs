//! Configuration for the license gate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Well-known location of the provisioned token.
pub const DEFAULT_TOKEN_PATH: &str = "/etc/aegis/auth.token";

pub const DEFAULT_ISSUER: &str = "aegis";

pub const DEFAULT_AUDIENCE: &str = "aegis-os";

/// License gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LicenseConfig {
    /// Path of the signed token file.
    pub token_path: PathBuf,

    /// Required `iss` claim.
    pub issuer: String,

    /// Required `aud` claim (one entry must match).
    pub audience: String,

    /// Leeway in seconds for time-based validations (exp, nbf)
    pub leeway_seconds: u32,

    /// Public key used to verify token signatures.
    pub trusted_key: TrustedKeyConfig,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            issuer: DEFAULT_ISSUER.to_owned(),
            audience: DEFAULT_AUDIENCE.to_owned(),
            leeway_seconds: 60,
            trusted_key: TrustedKeyConfig::default(),
        }
    }
}

/// Where the trusted Ed25519 public key comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TrustedKeyConfig {
    /// Key compiled into the binary.
    #[default]
    Embedded,
    /// Raw 32-byte key, base64url without padding.
    Base64Url { key: String },
    /// SPKI PEM file (`BEGIN PUBLIC KEY`) provisioned at deploy time.
    PemFile { path: PathBuf },
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = LicenseConfig::default();
        assert_eq!(cfg.token_path, PathBuf::from("/etc/aegis/auth.token"));
        assert_eq!(cfg.issuer, "aegis");
        assert_eq!(cfg.audience, "aegis-os");
        assert_eq!(cfg.trusted_key, TrustedKeyConfig::Embedded);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: LicenseConfig = serde_json::from_value(serde_json::json!({
            "token_path": "/tmp/token",
            "trusted_key": { "source": "base64_url", "key": "abc" }
        }))
        .unwrap();

        assert_eq!(cfg.token_path, PathBuf::from("/tmp/token"));
        assert_eq!(cfg.issuer, DEFAULT_ISSUER);
        assert_eq!(
            cfg.trusted_key,
            TrustedKeyConfig::Base64Url {
                key: "abc".to_owned()
            }
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<LicenseConfig, _> =
            serde_json::from_value(serde_json::json!({ "tier": "gamer" }));
        assert!(result.is_err());
    }
}
