//! The license gate: owns the validator and the published state and runs the
//! load, validate, publish pipeline.

use std::path::Path;
use std::sync::Arc;

use aegis_license_sdk::{DeactivationReason, LicenseQueryApi, LicenseState, Tier};

use crate::LICENSE_GATE_VERSION;
use crate::claims::ParsedToken;
use crate::config::LicenseConfig;
use crate::errors::{KeyError, LicenseError, LoadError, ValidationError};
use crate::loader::{self, RawToken};
use crate::state::{StateWriter, TierStateManager, Transition};
use crate::validator::TokenValidator;

/// What one pipeline run concluded.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// A valid token was found; its tier is now active.
    Activated { tier: Tier, transition: Transition },
    /// No token file. Running unlicensed.
    TokenAbsent,
    /// The token was read but rejected.
    Rejected(ValidationError),
    /// The token file could not be read.
    LoadFailed(LoadError),
}

impl PipelineOutcome {
    #[must_use]
    pub fn is_activated(&self) -> bool {
        matches!(self, PipelineOutcome::Activated { .. })
    }
}

/// License subsystem handle.
///
/// Construct once, call [`init`](Self::init), share behind an `Arc`, and query
/// through [`LicenseQueryApi`]. [`shutdown`](Self::shutdown) returns it to the
/// unlicensed state.
#[derive(Debug)]
pub struct LicenseGate {
    config: LicenseConfig,
    validator: TokenValidator,
    state: TierStateManager,
}

impl LicenseGate {
    /// Create a gate for `config`. Nothing is loaded until [`init`](Self::init).
    ///
    /// # Errors
    /// Returns `KeyError` if the trusted key cannot be loaded.
    pub fn new(config: LicenseConfig) -> Result<Self, KeyError> {
        let validator = TokenValidator::from_config(&config)?;
        tracing::debug!(key_source = validator.key().source(), "trusted key loaded");
        Ok(Self::with_validator(config, validator))
    }

    #[must_use]
    pub fn with_validator(config: LicenseConfig, validator: TokenValidator) -> Self {
        Self {
            config,
            validator,
            state: TierStateManager::new(),
        }
    }

    /// Where the trusted key came from (`embedded`, `base64url` or `pem`).
    #[must_use]
    pub fn key_source(&self) -> &'static str {
        self.validator.key().source()
    }

    #[must_use]
    pub fn state(&self) -> &TierStateManager {
        &self.state
    }

    /// Run the pipeline once at startup.
    #[tracing::instrument(name = "license_init", skip_all, fields(path = %self.config.token_path.display()))]
    pub fn init(&self) -> PipelineOutcome {
        self.run_pipeline()
    }

    /// Re-read and re-validate the token.
    ///
    /// Only the final state is published. A failure deactivates; it never
    /// leaves the previous tier active.
    #[tracing::instrument(name = "license_reload", skip_all, fields(path = %self.config.token_path.display()))]
    pub fn reload(&self) -> PipelineOutcome {
        self.run_pipeline()
    }

    /// Return to the unlicensed state.
    pub fn shutdown(&self) {
        self.state.deactivate(DeactivationReason::Unloaded);
        tracing::info!("license gate shut down");
    }

    /// Validate the token at `path` without touching the published state.
    ///
    /// # Errors
    /// Returns `LicenseError` if the file cannot be read or the token is rejected.
    pub fn verify_file(&self, path: &Path) -> Result<ParsedToken, LicenseError> {
        let raw = loader::load(path)?;
        Ok(self.validator.validate(&raw)?)
    }

    /// Validate raw token bytes without touching the published state.
    ///
    /// # Errors
    /// Returns `ValidationError` if the token is rejected.
    pub fn verify_bytes(&self, bytes: &[u8]) -> Result<ParsedToken, ValidationError> {
        self.validator.validate(&RawToken::from_bytes(bytes))
    }

    fn run_pipeline(&self) -> PipelineOutcome {
        let mut writer = self.state.begin_transition();

        match loader::load(&self.config.token_path) {
            Ok(raw) => self.validate_and_publish(&mut writer, &raw),
            Err(LoadError::NotFound { .. }) => {
                tracing::warn!("no license token provisioned, running unlicensed");
                writer.deactivate(DeactivationReason::TokenAbsent);
                PipelineOutcome::TokenAbsent
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load license token");
                writer.deactivate(DeactivationReason::LoadFailed);
                PipelineOutcome::LoadFailed(e)
            }
        }
    }

    fn validate_and_publish(&self, writer: &mut StateWriter<'_>, raw: &RawToken) -> PipelineOutcome {
        match self.validator.validate(raw) {
            Ok(token) => {
                let tier = token.tier();
                if tier == Tier::Unknown {
                    tracing::warn!(
                        tier_claim = token.tier_claim(),
                        "token carries an unrecognized tier, no features unlocked"
                    );
                }
                let transition = writer.activate(tier);
                PipelineOutcome::Activated { tier, transition }
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind().as_str(), "license token rejected");
                writer.deactivate(DeactivationReason::Rejected(e.kind()));
                PipelineOutcome::Rejected(e)
            }
        }
    }
}

impl LicenseQueryApi for LicenseGate {
    fn snapshot(&self) -> Arc<LicenseState> {
        self.state.snapshot()
    }

    fn current_version(&self) -> &'static str {
        LICENSE_GATE_VERSION
    }
}
