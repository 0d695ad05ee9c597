//! Typed view of a verified token payload.

use aegis_license_sdk::Tier;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::errors::ValidationError;

/// Claim names of the license token payload.
pub struct LicenseClaim;

impl LicenseClaim {
    pub const ISS: &'static str = "iss";
    pub const AUD: &'static str = "aud";
    pub const EXP: &'static str = "exp";
    pub const NBF: &'static str = "nbf";
    pub const IAT: &'static str = "iat";
    pub const SUB: &'static str = "sub";
    pub const TIER: &'static str = "tier";
    /// Token format version.
    pub const VER: &'static str = "ver";
}

/// Only supported value of the `ver` claim.
pub const TOKEN_FORMAT_VERSION: i64 = 1;

/// Decoded token, built once per validation attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    issuer: String,
    audiences: Vec<String>,
    expires_at: OffsetDateTime,
    not_before: Option<OffsetDateTime>,
    issued_at: Option<OffsetDateTime>,
    subject: Option<String>,
    tier_claim: String,
    tier: Tier,
    signature: Vec<u8>,
}

impl ParsedToken {
    /// Normalize a signature-verified payload.
    ///
    /// # Errors
    /// `MalformedToken` if the payload is not a JSON object, `MissingClaim`
    /// for an absent required claim, `InvalidClaimFormat` for a wrong type.
    pub fn from_claims(payload: &Value, signature: Vec<u8>) -> Result<Self, ValidationError> {
        let claims = payload
            .as_object()
            .ok_or_else(|| ValidationError::malformed("payload must be a JSON object"))?;

        if let Some(ver) = claims.get(LicenseClaim::VER)
            && ver.as_i64() != Some(TOKEN_FORMAT_VERSION)
        {
            return Err(ValidationError::invalid_claim(
                LicenseClaim::VER,
                format!("unsupported token version, expected {TOKEN_FORMAT_VERSION}"),
            ));
        }

        let issuer = extract_string(required(claims, LicenseClaim::ISS)?, LicenseClaim::ISS)?;
        let audiences = extract_audiences(required(claims, LicenseClaim::AUD)?)?;
        let expires_at = parse_timestamp(required(claims, LicenseClaim::EXP)?, LicenseClaim::EXP)?;
        let tier_claim = extract_string(required(claims, LicenseClaim::TIER)?, LicenseClaim::TIER)?;

        let not_before = claims
            .get(LicenseClaim::NBF)
            .map(|v| parse_timestamp(v, LicenseClaim::NBF))
            .transpose()?;
        let issued_at = claims
            .get(LicenseClaim::IAT)
            .map(|v| parse_timestamp(v, LicenseClaim::IAT))
            .transpose()?;
        let subject = claims
            .get(LicenseClaim::SUB)
            .map(|v| extract_string(v, LicenseClaim::SUB))
            .transpose()?;

        let tier = Tier::from_claim(&tier_claim);

        Ok(Self {
            issuer,
            audiences,
            expires_at,
            not_before,
            issued_at,
            subject,
            tier_claim,
            tier,
            signature,
        })
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }

    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    #[must_use]
    pub fn not_before(&self) -> Option<OffsetDateTime> {
        self.not_before
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<OffsetDateTime> {
        self.issued_at
    }

    /// License identifier, when the issuer set one.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The `tier` claim exactly as signed.
    #[must_use]
    pub fn tier_claim(&self) -> &str {
        &self.tier_claim
    }

    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Raw Ed25519 signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

fn required<'a>(claims: &'a Map<String, Value>, field: &str) -> Result<&'a Value, ValidationError> {
    claims
        .get(field)
        .ok_or_else(|| ValidationError::MissingClaim(field.to_owned()))
}

fn extract_string(value: &Value, field: &str) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| ValidationError::invalid_claim(field, "must be a string"))
}

fn extract_audiences(value: &Value) -> Result<Vec<String>, ValidationError> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(arr) => arr
            .iter()
            .map(|v| extract_string(v, LicenseClaim::AUD))
            .collect(),
        _ => Err(ValidationError::invalid_claim(
            LicenseClaim::AUD,
            "must be a string or an array of strings",
        )),
    }
}

fn parse_timestamp(value: &Value, field: &str) -> Result<OffsetDateTime, ValidationError> {
    let ts = value
        .as_i64()
        .ok_or_else(|| ValidationError::invalid_claim(field, "must be a number (unix timestamp)"))?;

    OffsetDateTime::from_unix_timestamp(ts)
        .map_err(|_| ValidationError::invalid_claim(field, "invalid unix timestamp"))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_claims() -> Value {
        json!({
            "iss": "aegis",
            "aud": "aegis-os",
            "exp": 9_999_999_999_i64,
            "tier": "gamer"
        })
    }

    #[test]
    fn test_minimal_claims() {
        let token = ParsedToken::from_claims(&base_claims(), vec![1, 2, 3]).unwrap();

        assert_eq!(token.issuer(), "aegis");
        assert_eq!(token.audiences(), ["aegis-os"]);
        assert_eq!(token.expires_at().unix_timestamp(), 9_999_999_999);
        assert_eq!(token.tier_claim(), "gamer");
        assert_eq!(token.tier(), Tier::Gamer);
        assert_eq!(token.signature(), [1, 2, 3]);
        assert!(token.subject().is_none());
        assert!(token.not_before().is_none());
    }

    #[test]
    fn test_optional_claims() {
        let mut claims = base_claims();
        claims["sub"] = json!("lic-0042");
        claims["iat"] = json!(1_700_000_000);
        claims["nbf"] = json!(1_700_000_000);
        claims["ver"] = json!(1);
        claims["aud"] = json!(["other", "aegis-os"]);

        let token = ParsedToken::from_claims(&claims, Vec::new()).unwrap();
        assert_eq!(token.subject(), Some("lic-0042"));
        assert_eq!(token.issued_at().unwrap().unix_timestamp(), 1_700_000_000);
        assert_eq!(token.audiences().len(), 2);
    }

    #[test]
    fn test_missing_tier() {
        let mut claims = base_claims();
        claims.as_object_mut().unwrap().remove("tier");

        let err = ParsedToken::from_claims(&claims, Vec::new()).unwrap_err();
        assert_eq!(err, ValidationError::MissingClaim("tier".to_owned()));
    }

    #[test]
    fn test_wrong_claim_types() {
        let mut claims = base_claims();
        claims["exp"] = json!("tomorrow");
        let err = ParsedToken::from_claims(&claims, Vec::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidClaimFormat { ref field, .. } if field == "exp"));

        let mut claims = base_claims();
        claims["tier"] = json!(3);
        let err = ParsedToken::from_claims(&claims, Vec::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidClaimFormat { ref field, .. } if field == "tier"));

        let mut claims = base_claims();
        claims["aud"] = json!(["aegis-os", 7]);
        let err = ParsedToken::from_claims(&claims, Vec::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidClaimFormat { ref field, .. } if field == "aud"));
    }

    #[test]
    fn test_unsupported_version() {
        let mut claims = base_claims();
        claims["ver"] = json!(2);
        let err = ParsedToken::from_claims(&claims, Vec::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidClaimFormat { ref field, .. } if field == "ver"));
    }

    #[test]
    fn test_non_object_payload() {
        let err = ParsedToken::from_claims(&json!(["gamer"]), Vec::new()).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedToken(_)));
    }

    #[test]
    fn test_unknown_tier_claim_is_kept_verbatim() {
        let mut claims = base_claims();
        claims["tier"] = json!("super-gamer-tier");
        let token = ParsedToken::from_claims(&claims, Vec::new()).unwrap();
        assert_eq!(token.tier(), Tier::Unknown);
        assert_eq!(token.tier_claim(), "super-gamer-tier");
    }
}
