//! Tier state manager: the only writer of the license state.
//!
//! Readers load the current snapshot lock-free from an `ArcSwap`. Writers are
//! serialized by a mutex and publish whole snapshots, so a reader never sees a
//! mix of two transitions.

use std::sync::Arc;

use aegis_license_sdk::{DeactivationReason, LicensePhase, LicenseState, Tier};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};
use time::OffsetDateTime;

/// Result of a state write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new snapshot was published.
    Published,
    /// The requested state was already current; nothing was published.
    Unchanged,
}

/// Owns the published license state.
#[derive(Debug)]
pub struct TierStateManager {
    current: ArcSwap<LicenseState>,
    writer: Mutex<()>,
}

impl Default for TierStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TierStateManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(LicenseState::uninitialized()),
            writer: Mutex::new(()),
        }
    }

    /// Current state (lock-free).
    #[must_use]
    pub fn snapshot(&self) -> Arc<LicenseState> {
        self.current.load_full()
    }

    /// Take the writer lock. Blocks while another transition is in progress.
    pub fn begin_transition(&self) -> StateWriter<'_> {
        StateWriter {
            manager: self,
            _guard: self.writer.lock(),
        }
    }

    /// Activate `tier` under the writer lock.
    pub fn activate(&self, tier: Tier) -> Transition {
        self.begin_transition().activate(tier)
    }

    /// Deactivate under the writer lock.
    pub fn deactivate(&self, reason: DeactivationReason) -> Transition {
        self.begin_transition().deactivate(reason)
    }

    fn publish(&self, state: LicenseState) {
        self.current.store(Arc::new(state));
    }
}

/// Exclusive write access to the state for the lifetime of the guard.
pub struct StateWriter<'a> {
    manager: &'a TierStateManager,
    _guard: MutexGuard<'a, ()>,
}

impl StateWriter<'_> {
    /// State as of the start of this write.
    #[must_use]
    pub fn current(&self) -> Arc<LicenseState> {
        self.manager.snapshot()
    }

    /// Publish `tier` as active.
    ///
    /// Re-activating the tier that is already active is a no-op and keeps the
    /// original `validated_at`. Activating `Tier::Unlicensed` deactivates.
    pub fn activate(&mut self, tier: Tier) -> Transition {
        let current = self.current();
        if current.is_active() && current.tier() == tier {
            tracing::trace!(%tier, "tier already active");
            return Transition::Unchanged;
        }

        let Some(next) = LicenseState::active(tier, OffsetDateTime::now_utc()) else {
            return self.deactivate(DeactivationReason::Requested);
        };

        self.manager.publish(next);
        tracing::info!(
            %tier,
            previous = %current.tier(),
            "license tier activated"
        );
        Transition::Published
    }

    /// Publish the inactive state.
    pub fn deactivate(&mut self, reason: DeactivationReason) -> Transition {
        let current = self.current();
        if current.phase() == LicensePhase::Deactivated && current.reason() == Some(reason) {
            return Transition::Unchanged;
        }

        self.manager.publish(LicenseState::deactivated(reason));
        if current.is_active() {
            tracing::info!(
                previous = %current.tier(),
                reason = reason.as_str(),
                "license deactivated"
            );
        } else {
            tracing::debug!(reason = reason.as_str(), "license state set inactive");
        }
        Transition::Published
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use aegis_license_sdk::{FeatureSet, RejectionKind, features_for};

    #[test]
    fn test_starts_uninitialized() {
        let manager = TierStateManager::new();
        let state = manager.snapshot();

        assert_eq!(state.phase(), LicensePhase::Uninitialized);
        assert!(!state.is_active());
        assert_eq!(state.tier(), Tier::Unlicensed);
        assert_eq!(state.features(), FeatureSet::EMPTY);
    }

    #[test]
    fn test_activate_publishes_consistent_snapshot() {
        let manager = TierStateManager::new();
        assert_eq!(manager.activate(Tier::Server), Transition::Published);

        let state = manager.snapshot();
        assert!(state.is_active());
        assert_eq!(state.tier(), Tier::Server);
        assert_eq!(state.features(), features_for(Tier::Server));
        assert!(state.validated_at().is_some());
    }

    #[test]
    fn test_activate_is_idempotent() {
        let manager = TierStateManager::new();
        manager.activate(Tier::Gamer);
        let first = manager.snapshot();

        assert_eq!(manager.activate(Tier::Gamer), Transition::Unchanged);
        let second = manager.snapshot();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.validated_at(), second.validated_at());
    }

    #[test]
    fn test_activate_other_tier_republishes() {
        let manager = TierStateManager::new();
        manager.activate(Tier::Gamer);
        assert_eq!(manager.activate(Tier::Basic), Transition::Published);
        assert_eq!(manager.snapshot().tier(), Tier::Basic);
    }

    #[test]
    fn test_activate_unlicensed_deactivates() {
        let manager = TierStateManager::new();
        manager.activate(Tier::Professional);
        manager.activate(Tier::Unlicensed);

        let state = manager.snapshot();
        assert!(!state.is_active());
        assert_eq!(state.tier(), Tier::Unlicensed);
        assert_eq!(state.reason(), Some(DeactivationReason::Requested));
    }

    #[test]
    fn test_deactivate_records_reason() {
        let manager = TierStateManager::new();
        manager.activate(Tier::Gamer);
        let reason = DeactivationReason::Rejected(RejectionKind::Expired);

        assert_eq!(manager.deactivate(reason), Transition::Published);
        assert_eq!(manager.deactivate(reason), Transition::Unchanged);
        assert_eq!(manager.snapshot().reason(), Some(reason));
    }

    #[test]
    fn test_unknown_tier_is_active_with_no_features() {
        let manager = TierStateManager::new();
        manager.activate(Tier::Unknown);

        let state = manager.snapshot();
        assert!(state.is_active());
        assert_eq!(state.tier(), Tier::Unknown);
        assert!(state.features().is_empty());
    }

    #[test]
    fn test_writer_sees_own_publication() {
        let manager = TierStateManager::new();
        let mut writer = manager.begin_transition();
        writer.activate(Tier::Freemium);
        assert_eq!(writer.current().tier(), Tier::Freemium);
    }
}
