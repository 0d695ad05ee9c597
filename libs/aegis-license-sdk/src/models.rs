use std::fmt;

use time::OffsetDateTime;

use crate::capabilities;

/// License tier carried by a validated token.
///
/// The set is closed: claim strings that do not name a known tier map to
/// [`Tier::Unknown`], which unlocks nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tier {
    #[default]
    Unlicensed,
    Freemium,
    Basic,
    Gamer,
    AiDeveloper,
    Server,
    Professional,
    Unknown,
}

impl Tier {
    pub const ALL: [Tier; 8] = [
        Tier::Unlicensed,
        Tier::Freemium,
        Tier::Basic,
        Tier::Gamer,
        Tier::AiDeveloper,
        Tier::Server,
        Tier::Professional,
        Tier::Unknown,
    ];

    /// Map a `tier` claim value to a tier by exact match.
    ///
    /// `"unlicensed"` is not a grantable tier and maps to [`Tier::Unknown`].
    #[must_use]
    pub fn from_claim(claim: &str) -> Self {
        match claim {
            "freemium" => Tier::Freemium,
            "basic" => Tier::Basic,
            "gamer" => Tier::Gamer,
            "ai" | "ai_developer" => Tier::AiDeveloper,
            "server" => Tier::Server,
            "professional" => Tier::Professional,
            _ => Tier::Unknown,
        }
    }

    /// Name in the token claim vocabulary, `"none"` when unlicensed.
    #[must_use]
    pub const fn claim_name(self) -> &'static str {
        match self {
            Tier::Unlicensed => "none",
            Tier::Freemium => "freemium",
            Tier::Basic => "basic",
            Tier::Gamer => "gamer",
            Tier::AiDeveloper => "ai",
            Tier::Server => "server",
            Tier::Professional => "professional",
            Tier::Unknown => "unknown",
        }
    }

    /// Name reported by the `status` attribute.
    #[must_use]
    pub const fn status_name(self) -> &'static str {
        match self {
            Tier::Unlicensed => "unlicensed",
            Tier::Freemium => "freemium",
            Tier::Basic => "basic",
            Tier::Gamer => "gamer",
            Tier::AiDeveloper => "ai_developer",
            Tier::Server => "server",
            Tier::Professional => "professional",
            Tier::Unknown => "unknown",
        }
    }

    /// Stable numeric code reported by the `tier` attribute.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Tier::Unlicensed => 0,
            Tier::Professional => 1,
            Tier::Freemium => 2,
            Tier::Gamer => 3,
            Tier::AiDeveloper => 4,
            Tier::Server => 5,
            Tier::Basic => 6,
            Tier::Unknown => 7,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.claim_name())
    }
}

/// A named unit of functionality whose availability is gated by tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Feature {
    // Common base
    BasicMonitoring,
    GamingOptimization,
    CommunitySupport,
    ProtonWine,
    SystemUtilities,
    // Paid base
    SecurityUpdates,
    PriorityUpdates,
    // Gamer
    AiFrameOptimization,
    P2pNetworkTuning,
    LowLatencyMode,
    // AI developer
    DockerIntegration,
    GpuAcceleration,
    ContainerOptimization,
    // Server
    AiServerAcceleration,
    MultiTenantIsolation,
    HighPerformanceNetworking,
    // Professional
    ProfessionalSupport,
    AdvancedMonitoring,
    KernelEnhancements,
    EnterpriseFeatures,
}

impl Feature {
    pub const ALL: [Feature; 20] = [
        Feature::BasicMonitoring,
        Feature::GamingOptimization,
        Feature::CommunitySupport,
        Feature::ProtonWine,
        Feature::SystemUtilities,
        Feature::SecurityUpdates,
        Feature::PriorityUpdates,
        Feature::AiFrameOptimization,
        Feature::P2pNetworkTuning,
        Feature::LowLatencyMode,
        Feature::DockerIntegration,
        Feature::GpuAcceleration,
        Feature::ContainerOptimization,
        Feature::AiServerAcceleration,
        Feature::MultiTenantIsolation,
        Feature::HighPerformanceNetworking,
        Feature::ProfessionalSupport,
        Feature::AdvancedMonitoring,
        Feature::KernelEnhancements,
        Feature::EnterpriseFeatures,
    ];

    /// Feature identifier as reported by the `features` attributes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Feature::BasicMonitoring => "basic_monitoring",
            Feature::GamingOptimization => "gaming_optimization",
            Feature::CommunitySupport => "community_support",
            Feature::ProtonWine => "proton_wine",
            Feature::SystemUtilities => "system_utilities",
            Feature::SecurityUpdates => "security_updates",
            Feature::PriorityUpdates => "priority_updates",
            Feature::AiFrameOptimization => "ai_frame_optimization",
            Feature::P2pNetworkTuning => "p2p_network_tuning",
            Feature::LowLatencyMode => "low_latency_mode",
            Feature::DockerIntegration => "docker_integration",
            Feature::GpuAcceleration => "gpu_acceleration",
            Feature::ContainerOptimization => "container_optimization",
            Feature::AiServerAcceleration => "ai_server_acceleration",
            Feature::MultiTenantIsolation => "multi_tenant_isolation",
            Feature::HighPerformanceNetworking => "high_performance_networking",
            Feature::ProfessionalSupport => "professional_support",
            Feature::AdvancedMonitoring => "advanced_monitoring",
            Feature::KernelEnhancements => "kernel_enhancements",
            Feature::EnterpriseFeatures => "enterprise_features",
        }
    }

    const fn bit(self) -> u32 {
        1 << (self as u8)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of features, stored as a bitmask so lookups never allocate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureSet(u32);

impl FeatureSet {
    pub const EMPTY: FeatureSet = FeatureSet(0);

    #[must_use]
    pub const fn from_features(features: &[Feature]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < features.len() {
            bits |= features[i].bit();
            i += 1;
        }
        FeatureSet(bits)
    }

    /// Every known feature.
    #[must_use]
    pub const fn all() -> Self {
        Self::from_features(&Feature::ALL)
    }

    #[must_use]
    pub const fn contains(self, feature: Feature) -> bool {
        self.0 & feature.bit() != 0
    }

    #[must_use]
    pub const fn with(self, feature: Feature) -> Self {
        FeatureSet(self.0 | feature.bit())
    }

    #[must_use]
    pub const fn union(self, other: FeatureSet) -> Self {
        FeatureSet(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersection(self, other: FeatureSet) -> Self {
        FeatureSet(self.0 & other.0)
    }

    #[must_use]
    pub const fn difference(self, other: FeatureSet) -> Self {
        FeatureSet(self.0 & !other.0)
    }

    #[must_use]
    pub const fn is_superset(self, other: FeatureSet) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.iter().count()
    }

    /// Iterate features in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Feature> {
        Feature::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        iter.into_iter().fold(FeatureSet::EMPTY, FeatureSet::with)
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Feature::as_str)).finish()
    }
}

/// Lifecycle phase of the license state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicensePhase {
    /// Nothing has been validated yet.
    Uninitialized,
    /// A token was validated and its tier published.
    Active,
    /// Torn down or rejected. Reads the same as `Uninitialized`.
    Deactivated,
}

/// Typed class of a token rejection, kept in snapshots for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Malformed,
    SignatureInvalid,
    Expired,
    NotYetValid,
    IssuerMismatch,
    AudienceMismatch,
    MissingClaim,
    InvalidClaim,
}

impl RejectionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RejectionKind::Malformed => "malformed",
            RejectionKind::SignatureInvalid => "signature_invalid",
            RejectionKind::Expired => "expired",
            RejectionKind::NotYetValid => "not_yet_valid",
            RejectionKind::IssuerMismatch => "issuer_mismatch",
            RejectionKind::AudienceMismatch => "audience_mismatch",
            RejectionKind::MissingClaim => "missing_claim",
            RejectionKind::InvalidClaim => "invalid_claim",
        }
    }
}

/// Why the state was last deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationReason {
    /// Explicit request, including activation of `Unlicensed`.
    Requested,
    /// The subsystem was torn down.
    Unloaded,
    /// No token file at the configured path.
    TokenAbsent,
    /// The token file could not be read.
    LoadFailed,
    /// The token was read but rejected.
    Rejected(RejectionKind),
}

impl DeactivationReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DeactivationReason::Requested => "requested",
            DeactivationReason::Unloaded => "unloaded",
            DeactivationReason::TokenAbsent => "token_absent",
            DeactivationReason::LoadFailed => "load_failed",
            DeactivationReason::Rejected(kind) => kind.as_str(),
        }
    }
}

/// Immutable snapshot of the license state.
///
/// Fields are private and only consistent combinations can be built:
/// an active snapshot never carries `Tier::Unlicensed`, an inactive one always
/// does, and `features` is always `features_for(tier)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseState {
    phase: LicensePhase,
    tier: Tier,
    features: FeatureSet,
    validated_at: Option<OffsetDateTime>,
    reason: Option<DeactivationReason>,
}

impl LicenseState {
    #[must_use]
    pub const fn uninitialized() -> Self {
        Self {
            phase: LicensePhase::Uninitialized,
            tier: Tier::Unlicensed,
            features: FeatureSet::EMPTY,
            validated_at: None,
            reason: None,
        }
    }

    /// Active snapshot for `tier`, or `None` for `Tier::Unlicensed`.
    #[must_use]
    pub fn active(tier: Tier, validated_at: OffsetDateTime) -> Option<Self> {
        if tier == Tier::Unlicensed {
            return None;
        }
        Some(Self {
            phase: LicensePhase::Active,
            tier,
            features: capabilities::features_for(tier),
            validated_at: Some(validated_at),
            reason: None,
        })
    }

    #[must_use]
    pub const fn deactivated(reason: DeactivationReason) -> Self {
        Self {
            phase: LicensePhase::Deactivated,
            tier: Tier::Unlicensed,
            features: FeatureSet::EMPTY,
            validated_at: None,
            reason: Some(reason),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> LicensePhase {
        self.phase
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.phase, LicensePhase::Active)
    }

    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub const fn features(&self) -> FeatureSet {
        self.features
    }

    #[must_use]
    pub const fn disabled_features(&self) -> FeatureSet {
        FeatureSet::all().difference(self.features)
    }

    #[must_use]
    pub const fn validated_at(&self) -> Option<OffsetDateTime> {
        self.validated_at
    }

    #[must_use]
    pub const fn reason(&self) -> Option<DeactivationReason> {
        self.reason
    }
}

impl Default for LicenseState {
    fn default() -> Self {
        Self::uninitialized()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_claim_is_exact() {
        assert_eq!(Tier::from_claim("gamer"), Tier::Gamer);
        assert_eq!(Tier::from_claim("ai"), Tier::AiDeveloper);
        assert_eq!(Tier::from_claim("ai_developer"), Tier::AiDeveloper);
        assert_eq!(Tier::from_claim("Gamer"), Tier::Unknown);
        assert_eq!(Tier::from_claim("gamer "), Tier::Unknown);
        assert_eq!(Tier::from_claim("super-gamer-tier"), Tier::Unknown);
        assert_eq!(Tier::from_claim("unlicensed"), Tier::Unknown);
        assert_eq!(Tier::from_claim(""), Tier::Unknown);
    }

    #[test]
    fn test_tier_codes_are_unique() {
        let mut codes: Vec<u8> = Tier::ALL.iter().map(|t| t.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Tier::ALL.len());
    }

    #[test]
    fn test_tier_names() {
        assert_eq!(Tier::AiDeveloper.to_string(), "ai");
        assert_eq!(Tier::AiDeveloper.status_name(), "ai_developer");
        assert_eq!(Tier::Unlicensed.claim_name(), "none");
        assert_eq!(Tier::Unlicensed.status_name(), "unlicensed");
    }

    #[test]
    fn test_feature_set_operations() {
        let set = FeatureSet::EMPTY
            .with(Feature::GpuAcceleration)
            .with(Feature::DockerIntegration);

        assert_eq!(set.len(), 2);
        assert!(set.contains(Feature::GpuAcceleration));
        assert!(!set.contains(Feature::LowLatencyMode));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Feature::DockerIntegration, Feature::GpuAcceleration]
        );

        let other: FeatureSet = [Feature::GpuAcceleration, Feature::LowLatencyMode]
            .into_iter()
            .collect();
        assert_eq!(set.intersection(other).len(), 1);
        assert_eq!(set.difference(other).len(), 1);
        assert_eq!(set.union(other).len(), 3);
        assert!(set.union(other).is_superset(set));
    }

    #[test]
    fn test_feature_universe_fits_bitmask() {
        assert_eq!(FeatureSet::all().len(), Feature::ALL.len());
    }

    #[test]
    fn test_active_state_never_unlicensed() {
        assert!(LicenseState::active(Tier::Unlicensed, OffsetDateTime::now_utc()).is_none());

        let state = LicenseState::active(Tier::Gamer, OffsetDateTime::now_utc()).unwrap();
        assert!(state.is_active());
        assert_eq!(state.tier(), Tier::Gamer);
        assert_eq!(state.features(), capabilities::features_for(Tier::Gamer));
        assert!(state.reason().is_none());
    }

    #[test]
    fn test_deactivated_reads_like_uninitialized() {
        let off = LicenseState::deactivated(DeactivationReason::Unloaded);
        let fresh = LicenseState::default();

        assert_eq!(off.is_active(), fresh.is_active());
        assert_eq!(off.tier(), fresh.tier());
        assert_eq!(off.features(), fresh.features());
        assert_eq!(off.disabled_features(), FeatureSet::all());
        assert_eq!(off.reason(), Some(DeactivationReason::Unloaded));
    }
}
