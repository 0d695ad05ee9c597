use std::sync::Arc;

use crate::models::{FeatureSet, LicenseState, Tier};

/// Read-only view of the current license entitlement.
///
/// Every method is a lock-free snapshot read and never performs I/O, so it is
/// safe to call from any number of threads. Callers that need several fields
/// from the same transition must read them from one [`snapshot`](Self::snapshot).
pub trait LicenseQueryApi: Send + Sync {
    /// The current state as a single consistent snapshot.
    fn snapshot(&self) -> Arc<LicenseState>;

    fn is_active(&self) -> bool {
        self.snapshot().is_active()
    }

    fn current_tier(&self) -> Tier {
        self.snapshot().tier()
    }

    fn current_features(&self) -> FeatureSet {
        self.snapshot().features()
    }

    /// Version of the license gate implementation.
    fn current_version(&self) -> &'static str;

    /// Exported form of [`is_active`](Self::is_active).
    fn is_licensed(&self) -> bool {
        self.is_active()
    }

    /// Exported tier name in the claim vocabulary, `"none"` when unlicensed.
    fn get_tier(&self) -> &'static str {
        self.current_tier().claim_name()
    }
}
