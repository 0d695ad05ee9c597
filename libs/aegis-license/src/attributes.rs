//! Read-only attribute surface.
//!
//! Each attribute renders one snapshot field as text ending in a newline.

use aegis_license_sdk::{FeatureSet, LicenseState};

/// Attributes exposed to other privileged components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseAttribute {
    /// Numeric tier code.
    Tier,
    Version,
    /// Tier status name.
    Status,
    /// Unlocked features, one per line.
    Features,
    /// Locked features, one per line.
    DisabledFeatures,
}

impl LicenseAttribute {
    pub const ALL: [LicenseAttribute; 5] = [
        LicenseAttribute::Tier,
        LicenseAttribute::Version,
        LicenseAttribute::Status,
        LicenseAttribute::Features,
        LicenseAttribute::DisabledFeatures,
    ];

    /// Attribute (file) name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            LicenseAttribute::Tier => "tier",
            LicenseAttribute::Version => "version",
            LicenseAttribute::Status => "status",
            LicenseAttribute::Features => "features",
            LicenseAttribute::DisabledFeatures => "disabled_features",
        }
    }

    /// Render this attribute from `state`.
    #[must_use]
    pub fn render(self, state: &LicenseState, version: &str) -> String {
        match self {
            LicenseAttribute::Tier => format!("{}\n", state.tier().code()),
            LicenseAttribute::Version => format!("{version}\n"),
            LicenseAttribute::Status => format!("{}\n", state.tier().status_name()),
            LicenseAttribute::Features => render_list(state.features()),
            LicenseAttribute::DisabledFeatures => render_list(state.disabled_features()),
        }
    }
}

/// Render every attribute from one snapshot.
#[must_use]
pub fn render_all(state: &LicenseState, version: &str) -> Vec<(LicenseAttribute, String)> {
    LicenseAttribute::ALL
        .into_iter()
        .map(|attr| (attr, attr.render(state, version)))
        .collect()
}

fn render_list(features: FeatureSet) -> String {
    features.iter().map(|feature| format!("{feature}\n")).collect()
}
