#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Aegis License Gate SDK.
//!
//! This crate defines the **transport-agnostic** contract that privileged
//! consumers use to observe the current license entitlement.
//!
//! # Public API
//!
//! - [`Tier`]: closed set of license tiers.
//! - [`Feature`] / [`FeatureSet`]: tier-gated feature capabilities.
//! - [`capabilities`]: the static tier to feature mapping.
//! - [`LicenseState`]: immutable snapshot of the license state.
//! - [`LicenseQueryApi`]: read-only, non-blocking query surface.

pub mod api;
pub mod capabilities;
pub mod models;

pub use api::LicenseQueryApi;
pub use capabilities::{disabled_features_for, features_for};
pub use models::{
    DeactivationReason, Feature, FeatureSet, LicensePhase, LicenseState, RejectionKind, Tier,
};
