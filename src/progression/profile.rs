//! Per-entity progression state
//!
//! One profile exists per player (favor) and one per religion (prestige).
//! Everything that can break an invariant is crate-private: callers read
//! freely but only the validator, branch manager and delta application may
//! write.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::branch::BranchLockManager;
use super::rank::RankProgressionTracker;
use crate::blessings::BlessingCatalog;
use crate::core::types::{BlessingId, BranchId, Currency, ProfileId, Rank, Scope};

/// Mutable progression record for one player or religion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressionProfile {
    id: ProfileId,
    currency_total: u64,
    rank: Rank,
    unlocked: AHashSet<BlessingId>,
    committed_branches: AHashSet<BranchId>,
    locked_branches: AHashSet<BranchId>,
    /// Bumped on every authoritative mutation
    revision: u64,
}

/// Rank movement caused by a currency change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyChange {
    pub previous_total: u64,
    pub new_total: u64,
    pub previous_rank: Rank,
    pub new_rank: Rank,
}

impl ProgressionProfile {
    /// Fresh profile: no currency, rank 0, nothing unlocked
    pub fn new(id: ProfileId) -> Self {
        Self {
            id,
            currency_total: 0,
            rank: 0,
            unlocked: AHashSet::new(),
            committed_branches: AHashSet::new(),
            locked_branches: AHashSet::new(),
            revision: 0,
        }
    }

    pub fn id(&self) -> ProfileId {
        self.id
    }

    pub fn scope(&self) -> Scope {
        self.id.scope()
    }

    pub fn currency(&self) -> Currency {
        self.id.currency()
    }

    pub fn currency_total(&self) -> u64 {
        self.currency_total
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn unlocked(&self) -> &AHashSet<BlessingId> {
        &self.unlocked
    }

    pub fn committed_branches(&self) -> &AHashSet<BranchId> {
        &self.committed_branches
    }

    pub fn locked_branches(&self) -> &AHashSet<BranchId> {
        &self.locked_branches
    }

    pub fn is_unlocked(&self, id: &BlessingId) -> bool {
        self.unlocked.contains(id)
    }

    pub fn is_branch_locked(&self, branch: &BranchId) -> bool {
        self.locked_branches.contains(branch)
    }

    pub fn is_branch_committed(&self, branch: &BranchId) -> bool {
        self.committed_branches.contains(branch)
    }

    /// Add currency and recompute rank. Totals never decrease.
    pub(crate) fn add_currency(
        &mut self,
        amount: u64,
        tracker: &RankProgressionTracker,
    ) -> CurrencyChange {
        let previous_total = self.currency_total;
        let previous_rank = self.rank;
        self.currency_total = self.currency_total.saturating_add(amount);
        self.rank = tracker.compute_rank(self.currency(), self.currency_total);
        CurrencyChange {
            previous_total,
            new_total: self.currency_total,
            previous_rank,
            new_rank: self.rank,
        }
    }

    /// Recompute the cached rank, e.g. after a rank table change
    pub(crate) fn refresh_rank(&mut self, tracker: &RankProgressionTracker) {
        self.rank = tracker.compute_rank(self.currency(), self.currency_total);
    }

    pub(crate) fn insert_unlocked(&mut self, id: BlessingId) -> bool {
        self.unlocked.insert(id)
    }

    pub(crate) fn remove_unlocked(&mut self, id: &BlessingId) -> bool {
        self.unlocked.remove(id)
    }

    pub(crate) fn commit_branch(&mut self, branch: BranchId) -> bool {
        self.committed_branches.insert(branch)
    }

    pub(crate) fn lock_branch(&mut self, branch: BranchId) -> bool {
        self.locked_branches.insert(branch)
    }

    pub(crate) fn replace_branches(
        &mut self,
        committed: AHashSet<BranchId>,
        locked: AHashSet<BranchId>,
    ) {
        self.committed_branches = committed;
        self.locked_branches = locked;
    }

    /// Mirror-side: adopt the server's currency and rank verbatim
    pub(crate) fn set_currency_from_server(&mut self, total: u64, rank: Rank) {
        self.currency_total = total;
        self.rank = rank;
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    pub(crate) fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Full state, deterministic ordering, for resync and persistence
    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            id: self.id,
            currency_total: self.currency_total,
            rank: self.rank,
            unlocked: self.unlocked.iter().cloned().collect(),
            committed_branches: self.committed_branches.iter().cloned().collect(),
            locked_branches: self.locked_branches.iter().cloned().collect(),
            revision: self.revision,
        }
    }

    /// Rebuild from a snapshot exactly as the server sent it
    pub(crate) fn from_snapshot(snapshot: ProfileSnapshot) -> Self {
        Self {
            id: snapshot.id,
            currency_total: snapshot.currency_total,
            rank: snapshot.rank,
            unlocked: snapshot.unlocked.into_iter().collect(),
            committed_branches: snapshot.committed_branches.into_iter().collect(),
            locked_branches: snapshot.locked_branches.into_iter().collect(),
            revision: snapshot.revision,
        }
    }
}

/// Serializable full copy of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub id: ProfileId,
    pub currency_total: u64,
    pub rank: Rank,
    pub unlocked: BTreeSet<BlessingId>,
    pub committed_branches: BTreeSet<BranchId>,
    pub locked_branches: BTreeSet<BranchId>,
    pub revision: u64,
}

impl ProgressionProfile {
    /// Rebuild a stored profile, trusting only the currency total, unlocked
    /// ids and revision. Rank comes from the tracker and branch sets from the
    /// catalog, so stale or hand-edited snapshots cannot smuggle state in.
    pub fn restore(
        snapshot: ProfileSnapshot,
        tracker: &RankProgressionTracker,
        catalog: &BlessingCatalog,
    ) -> Self {
        let mut profile = Self::from_snapshot(snapshot);
        profile.refresh_rank(tracker);
        BranchLockManager::recompute(catalog, &mut profile);
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PlayerId, ReligionId};

    #[test]
    fn test_new_profile_is_empty() {
        let profile = ProgressionProfile::new(PlayerId::new().into());
        assert_eq!(profile.currency_total(), 0);
        assert_eq!(profile.rank(), 0);
        assert!(profile.unlocked().is_empty());
        assert_eq!(profile.scope(), Scope::Player);
    }

    #[test]
    fn test_add_currency_recomputes_rank() {
        let tracker = RankProgressionTracker::default();
        let mut profile = ProgressionProfile::new(ReligionId::new().into());

        let change = profile.add_currency(600, &tracker);
        assert_eq!(change.previous_rank, 0);
        assert_eq!(change.new_rank, 1);
        assert_eq!(profile.rank(), tracker.compute_rank(Currency::Prestige, 600));

        let change = profile.add_currency(0, &tracker);
        assert_eq!(change.previous_rank, change.new_rank);
    }

    #[test]
    fn test_currency_saturates() {
        let tracker = RankProgressionTracker::default();
        let mut profile = ProgressionProfile::new(PlayerId::new().into());
        profile.add_currency(u64::MAX, &tracker);
        profile.add_currency(10, &tracker);
        assert_eq!(profile.currency_total(), u64::MAX);
        assert_eq!(profile.rank(), 4);
    }

    #[test]
    fn test_snapshot_restores_identical_profile() {
        let tracker = RankProgressionTracker::default();
        let mut profile = ProgressionProfile::new(PlayerId::new().into());
        profile.add_currency(2500, &tracker);
        profile.insert_unlocked("ember".into());
        profile.commit_branch("fire".into());
        profile.lock_branch("ice".into());
        profile.bump_revision();

        let restored = ProgressionProfile::from_snapshot(profile.snapshot());
        assert_eq!(restored, profile);
    }

    #[test]
    fn test_restore_derives_rank_and_branches() {
        let tracker = RankProgressionTracker::default();
        let catalog = BlessingCatalog::new(vec![
            crate::blessings::BlessingDefinition::new("ember", Scope::Player)
                .with_branch("fire")
                .excluding("ice"),
        ])
        .unwrap();
        let id: ProfileId = PlayerId::new().into();
        let forged = ProfileSnapshot {
            id,
            currency_total: 0,
            rank: 4,
            unlocked: ["ember".into()].into_iter().collect(),
            committed_branches: BTreeSet::new(),
            locked_branches: ["storm".into()].into_iter().collect(),
            revision: 3,
        };

        let profile = ProgressionProfile::restore(forged, &tracker, &catalog);
        assert_eq!(profile.rank(), 0);
        assert_eq!(profile.revision(), 3);
        assert!(profile.is_branch_committed(&"fire".into()));
        assert!(profile.is_branch_locked(&"ice".into()));
        assert!(!profile.is_branch_locked(&"storm".into()));
    }
}
