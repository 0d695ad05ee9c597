//! Token verification: structure, Ed25519 signature, then claims.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode};
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::claims::ParsedToken;
use crate::config::LicenseConfig;
use crate::errors::{KeyError, ValidationError};
use crate::keys::TrustedKey;
use crate::loader::{MAX_TOKEN_BYTES, RawToken};

/// The single accepted signing algorithm.
pub const PINNED_ALGORITHM: &str = "EdDSA";

const EXPECTED_TYP: &str = "JWT";

/// Fixed values the claims are checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimExpectations {
    pub issuer: String,
    pub audience: String,
    pub leeway_seconds: i64,
}

impl ClaimExpectations {
    #[must_use]
    pub fn from_config(config: &LicenseConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            leeway_seconds: i64::from(config.leeway_seconds),
        }
    }
}

impl Default for ClaimExpectations {
    fn default() -> Self {
        Self::from_config(&LicenseConfig::default())
    }
}

#[derive(Deserialize)]
struct JoseHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Validates raw tokens against one trusted key.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    key: TrustedKey,
    expectations: ClaimExpectations,
}

impl TokenValidator {
    #[must_use]
    pub fn new(key: TrustedKey, expectations: ClaimExpectations) -> Self {
        Self { key, expectations }
    }

    /// Build a validator from the license configuration.
    ///
    /// # Errors
    /// Returns `KeyError` if the configured trusted key cannot be loaded.
    pub fn from_config(config: &LicenseConfig) -> Result<Self, KeyError> {
        let key = TrustedKey::from_config(&config.trusted_key)?;
        Ok(Self::new(key, ClaimExpectations::from_config(config)))
    }

    #[must_use]
    pub fn key(&self) -> &TrustedKey {
        &self.key
    }

    /// Validate `raw` against the current time.
    ///
    /// # Errors
    /// Returns the first `ValidationError` encountered.
    pub fn validate(&self, raw: &RawToken) -> Result<ParsedToken, ValidationError> {
        self.validate_at(raw, OffsetDateTime::now_utc())
    }

    /// Validate `raw` as if the current time were `now`.
    ///
    /// # Errors
    /// Returns the first `ValidationError` encountered.
    pub fn validate_at(
        &self,
        raw: &RawToken,
        now: OffsetDateTime,
    ) -> Result<ParsedToken, ValidationError> {
        if raw.len() > MAX_TOKEN_BYTES {
            return Err(ValidationError::malformed(format!(
                "token is {} bytes, limit is {MAX_TOKEN_BYTES}",
                raw.len()
            )));
        }
        let text = std::str::from_utf8(raw.expose())
            .map_err(|_| ValidationError::malformed("token is not valid UTF-8"))?;
        let token = text.trim_matches(|c: char| c.is_ascii_whitespace());

        let (header_b64, signature_b64) = split_compact(token)?;
        check_header(header_b64)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| ValidationError::malformed("signature segment is not base64url"))?;

        let payload = self.verify_signature(token)?;
        let parsed = ParsedToken::from_claims(&payload, signature)?;

        self.check_time(&parsed, now)?;
        self.check_issuer_audience(&parsed)?;

        tracing::debug!(
            tier = %parsed.tier(),
            tier_claim = parsed.tier_claim(),
            subject = parsed.subject().unwrap_or("-"),
            "token validated"
        );
        Ok(parsed)
    }

    fn verify_signature(&self, token: &str) -> Result<Value, ValidationError> {
        let mut validation = Validation::new(Algorithm::EdDSA);

        // Time and audience checks are done on the normalized claims
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        let empty_claims: &[&str] = &[];
        validation.set_required_spec_claims(empty_claims);

        let data = decode::<Value>(token, self.key.decoding_key(), &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    ValidationError::SignatureInvalid
                }
                ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                    ValidationError::malformed(format!("payload: {e}"))
                }
                ErrorKind::InvalidToken => ValidationError::malformed("invalid token structure"),
                _ => ValidationError::SignatureInvalid,
            }
        })?;
        Ok(data.claims)
    }

    fn check_time(&self, token: &ParsedToken, now: OffsetDateTime) -> Result<(), ValidationError> {
        let now = now.unix_timestamp();
        let leeway = self.expectations.leeway_seconds;

        if now > token.expires_at().unix_timestamp().saturating_add(leeway) {
            return Err(ValidationError::Expired);
        }
        if let Some(nbf) = token.not_before()
            && now < nbf.unix_timestamp().saturating_sub(leeway)
        {
            return Err(ValidationError::NotYetValid);
        }
        Ok(())
    }

    fn check_issuer_audience(&self, token: &ParsedToken) -> Result<(), ValidationError> {
        if token.issuer() != self.expectations.issuer {
            return Err(ValidationError::IssuerMismatch {
                expected: self.expectations.issuer.clone(),
                actual: token.issuer().to_owned(),
            });
        }
        if !token
            .audiences()
            .iter()
            .any(|aud| *aud == self.expectations.audience)
        {
            return Err(ValidationError::AudienceMismatch {
                expected: self.expectations.audience.clone(),
                actual: token.audiences().to_vec(),
            });
        }
        Ok(())
    }
}

/// Split a compact JWS into its header and signature segments, checking
/// there are exactly three non-empty parts.
fn split_compact(token: &str) -> Result<(&str, &str), ValidationError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok((header, signature))
        }
        _ => Err(ValidationError::malformed(
            "expected three non-empty dot-separated segments",
        )),
    }
}

fn check_header(header_b64: &str) -> Result<(), ValidationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| ValidationError::malformed("header segment is not base64url"))?;
    let header: JoseHeader = serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::malformed(format!("header: {e}")))?;

    if header.alg != PINNED_ALGORITHM {
        tracing::debug!(alg = %header.alg, "rejecting token signed with unpinned algorithm");
        return Err(ValidationError::SignatureInvalid);
    }
    if let Some(typ) = header.typ.as_deref()
        && typ != EXPECTED_TYP
    {
        return Err(ValidationError::malformed(format!("unexpected typ '{typ}'")));
    }
    Ok(())
}
