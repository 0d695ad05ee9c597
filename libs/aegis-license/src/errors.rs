use std::path::PathBuf;

use aegis_license_sdk::RejectionKind;
use thiserror::Error;

/// Errors raised while reading the token file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No token provisioned. The gate runs unlicensed.
    #[error("token file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read token file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to allocate {requested} bytes for the token buffer")]
    AllocationFailure { requested: usize },

    #[error("token file exceeds {max} bytes")]
    TooLarge { max: usize },
}

/// Reasons a token is rejected by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Invalid signature or key")]
    SignatureInvalid,

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid (nbf check failed)")]
    NotYetValid,

    #[error("Issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("Audience mismatch: expected {expected}, got {actual:?}")]
    AudienceMismatch {
        expected: String,
        actual: Vec<String>,
    },

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Invalid claim format: {field} - {reason}")]
    InvalidClaimFormat { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken(reason.into())
    }

    pub(crate) fn invalid_claim(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidClaimFormat {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    /// Copyable class of this rejection.
    #[must_use]
    pub fn kind(&self) -> RejectionKind {
        match self {
            ValidationError::MalformedToken(_) => RejectionKind::Malformed,
            ValidationError::SignatureInvalid => RejectionKind::SignatureInvalid,
            ValidationError::Expired => RejectionKind::Expired,
            ValidationError::NotYetValid => RejectionKind::NotYetValid,
            ValidationError::IssuerMismatch { .. } => RejectionKind::IssuerMismatch,
            ValidationError::AudienceMismatch { .. } => RejectionKind::AudienceMismatch,
            ValidationError::MissingClaim(_) => RejectionKind::MissingClaim,
            ValidationError::InvalidClaimFormat { .. } => RejectionKind::InvalidClaim,
        }
    }
}

/// Errors raised while loading the trusted public key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid trusted public key: {0}")]
    InvalidKey(String),

    #[error("failed to read trusted key file {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error for one-shot token checks.
#[derive(Debug, Error)]
pub enum LicenseError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_kinds() {
        assert_eq!(
            ValidationError::malformed("x").kind(),
            RejectionKind::Malformed
        );
        assert_eq!(
            ValidationError::invalid_claim("exp", "must be a number").kind(),
            RejectionKind::InvalidClaim
        );
        assert_eq!(
            ValidationError::IssuerMismatch {
                expected: "aegis".to_owned(),
                actual: "mallory".to_owned(),
            }
            .kind(),
            RejectionKind::IssuerMismatch
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ValidationError::invalid_claim("exp", "must be a number (unix timestamp)");
        assert_eq!(
            err.to_string(),
            "Invalid claim format: exp - must be a number (unix timestamp)"
        );

        let err = LoadError::TooLarge { max: 2048 };
        assert_eq!(err.to_string(), "token file exceeds 2048 bytes");
    }
}
