//! Static tier to feature mapping.
//!
//! Paid tiers share a common base and then unlock one sibling bundle each.
//! Bundles never overlap, so no tier is a superset of another paid tier.

use crate::models::{Feature, FeatureSet, Tier};

const COMMON_BASE: FeatureSet = FeatureSet::from_features(&[
    Feature::BasicMonitoring,
    Feature::GamingOptimization,
    Feature::CommunitySupport,
    Feature::ProtonWine,
    Feature::SystemUtilities,
]);

const PAID_BASE: FeatureSet = COMMON_BASE.union(FeatureSet::from_features(&[
    Feature::SecurityUpdates,
    Feature::PriorityUpdates,
]));

const GAMER_BUNDLE: FeatureSet = FeatureSet::from_features(&[
    Feature::AiFrameOptimization,
    Feature::P2pNetworkTuning,
    Feature::LowLatencyMode,
]);

const AI_DEVELOPER_BUNDLE: FeatureSet = FeatureSet::from_features(&[
    Feature::DockerIntegration,
    Feature::GpuAcceleration,
    Feature::ContainerOptimization,
]);

const SERVER_BUNDLE: FeatureSet = FeatureSet::from_features(&[
    Feature::AiServerAcceleration,
    Feature::MultiTenantIsolation,
    Feature::HighPerformanceNetworking,
]);

const PROFESSIONAL_BUNDLE: FeatureSet = FeatureSet::from_features(&[
    Feature::ProfessionalSupport,
    Feature::AdvancedMonitoring,
    Feature::KernelEnhancements,
    Feature::EnterpriseFeatures,
]);

/// Features unlocked by `tier`.
///
/// Total and pure. `Unlicensed` and `Unknown` unlock nothing.
#[must_use]
pub const fn features_for(tier: Tier) -> FeatureSet {
    match tier {
        Tier::Unlicensed | Tier::Unknown => FeatureSet::EMPTY,
        Tier::Freemium => COMMON_BASE,
        Tier::Basic => PAID_BASE,
        Tier::Gamer => PAID_BASE.union(GAMER_BUNDLE),
        Tier::AiDeveloper => PAID_BASE.union(AI_DEVELOPER_BUNDLE),
        Tier::Server => PAID_BASE.union(SERVER_BUNDLE),
        Tier::Professional => PAID_BASE.union(PROFESSIONAL_BUNDLE),
    }
}

/// Features *not* unlocked by `tier`. Reporting only, never enforcement.
#[must_use]
pub const fn disabled_features_for(tier: Tier) -> FeatureSet {
    FeatureSet::all().difference(features_for(tier))
}
