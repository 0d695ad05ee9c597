#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Aegis license gate.
//!
//! Loads the signed license token, verifies it against the trusted Ed25519
//! key and publishes the resulting tier for lock-free queries. Every failure
//! leaves the system unlicensed.

pub mod attributes;
pub mod claims;
pub mod config;
pub mod errors;
pub mod gate;
pub mod keys;
pub mod loader;
pub mod state;
pub mod validator;

pub use aegis_license_sdk::{
    DeactivationReason, Feature, FeatureSet, LicensePhase, LicenseQueryApi, LicenseState,
    RejectionKind, Tier, disabled_features_for, features_for,
};

pub use attributes::{LicenseAttribute, render_all};
pub use claims::ParsedToken;
pub use config::{LicenseConfig, TrustedKeyConfig};
pub use errors::{KeyError, LicenseError, LoadError, ValidationError};
pub use gate::{LicenseGate, PipelineOutcome};
pub use keys::TrustedKey;
pub use loader::{MAX_TOKEN_BYTES, RawToken, load};
pub use state::{TierStateManager, Transition};
pub use validator::{ClaimExpectations, TokenValidator};

/// Version reported by the `version` attribute.
pub const LICENSE_GATE_VERSION: &str = env!("CARGO_PKG_VERSION");
