//! Branch commitment and locking
//!
//! Unlocking any node of a branch commits the whole branch and permanently
//! locks every branch it excludes. The ratchet only turns one way during
//! play; administrative revokes rebuild the sets from the unlocked ids.

use ahash::AHashSet;

use super::profile::ProgressionProfile;
use crate::blessings::{BlessingCatalog, BlessingDefinition};
use crate::core::types::BranchId;

/// Branch state changes produced by one unlock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchChange {
    pub committed: Option<BranchId>,
    pub newly_locked: Vec<BranchId>,
}

impl BranchChange {
    pub fn is_empty(&self) -> bool {
        self.committed.is_none() && self.newly_locked.is_empty()
    }
}

pub struct BranchLockManager;

impl BranchLockManager {
    /// Commit the definition's branch and lock everything it excludes.
    ///
    /// Exclusions come from the catalog, not just this definition, so every
    /// node of a branch forecloses the same set.
    pub fn on_unlock(
        catalog: &BlessingCatalog,
        profile: &mut ProgressionProfile,
        definition: &BlessingDefinition,
    ) -> BranchChange {
        let mut change = BranchChange::default();
        let Some(branch) = &definition.branch else {
            return change;
        };
        if !profile.commit_branch(branch.clone()) {
            return change;
        }
        change.committed = Some(branch.clone());

        let mut locked: Vec<BranchId> = catalog.exclusions(branch).cloned().collect();
        // Definition's own list is already folded into the catalog; kept for
        // definitions built against a different catalog instance
        for excluded in &definition.exclusive_branches {
            if !locked.contains(excluded) {
                locked.push(excluded.clone());
            }
        }
        for excluded in locked {
            if profile.lock_branch(excluded.clone()) {
                change.newly_locked.push(excluded);
            }
        }

        tracing::debug!(
            profile = %profile.id(),
            branch = %branch,
            locked = ?change.newly_locked,
            "Branch committed"
        );
        change
    }

    /// Rebuild committed and locked sets from the unlocked ids.
    ///
    /// Ids the catalog no longer knows are skipped.
    pub fn recompute(catalog: &BlessingCatalog, profile: &mut ProgressionProfile) {
        let mut committed = AHashSet::new();
        for id in profile.unlocked() {
            match catalog.get(id) {
                Some(def) => {
                    if let Some(branch) = &def.branch {
                        committed.insert(branch.clone());
                    }
                }
                None => {
                    tracing::warn!(profile = %profile.id(), blessing = %id, "Ignoring unknown unlocked blessing");
                }
            }
        }

        let locked: AHashSet<BranchId> = committed
            .iter()
            .flat_map(|branch| catalog.exclusions(branch).cloned())
            .collect();

        profile.replace_branches(committed, locked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PlayerId, Scope};

    fn catalog() -> BlessingCatalog {
        BlessingCatalog::new(vec![
            BlessingDefinition::new("x", Scope::Player)
                .with_branch("fire")
                .excluding("ice"),
            BlessingDefinition::new("x2", Scope::Player).with_branch("fire"),
            BlessingDefinition::new("y", Scope::Player).with_branch("ice"),
            BlessingDefinition::new("plain", Scope::Player),
        ])
        .unwrap()
    }

    #[test]
    fn test_unlock_commits_and_locks() {
        let catalog = catalog();
        let mut profile = ProgressionProfile::new(PlayerId::new().into());
        let x = catalog.get(&"x".into()).unwrap();

        let change = BranchLockManager::on_unlock(&catalog, &mut profile, x);
        assert_eq!(change.committed, Some("fire".into()));
        assert_eq!(change.newly_locked, vec![BranchId::from("ice")]);
        assert!(profile.is_branch_committed(&"fire".into()));
        assert!(profile.is_branch_locked(&"ice".into()));
    }

    #[test]
    fn test_sibling_node_locks_same_exclusions() {
        // x2 declares no exclusions itself but shares x's branch
        let catalog = catalog();
        let mut profile = ProgressionProfile::new(PlayerId::new().into());
        let x2 = catalog.get(&"x2".into()).unwrap();

        BranchLockManager::on_unlock(&catalog, &mut profile, x2);
        assert!(profile.is_branch_locked(&"ice".into()));
    }

    #[test]
    fn test_reverse_direction_locks() {
        let catalog = catalog();
        let mut profile = ProgressionProfile::new(PlayerId::new().into());
        let y = catalog.get(&"y".into()).unwrap();

        BranchLockManager::on_unlock(&catalog, &mut profile, y);
        assert!(profile.is_branch_locked(&"fire".into()));
    }

    #[test]
    fn test_second_unlock_in_branch_is_noop() {
        let catalog = catalog();
        let mut profile = ProgressionProfile::new(PlayerId::new().into());
        BranchLockManager::on_unlock(&catalog, &mut profile, catalog.get(&"x".into()).unwrap());
        let change =
            BranchLockManager::on_unlock(&catalog, &mut profile, catalog.get(&"x2".into()).unwrap());
        assert!(change.is_empty());
    }

    #[test]
    fn test_branchless_unlock_changes_nothing() {
        let catalog = catalog();
        let mut profile = ProgressionProfile::new(PlayerId::new().into());
        let change = BranchLockManager::on_unlock(
            &catalog,
            &mut profile,
            catalog.get(&"plain".into()).unwrap(),
        );
        assert!(change.is_empty());
        assert!(profile.committed_branches().is_empty());
    }

    #[test]
    fn test_recompute_matches_incremental() {
        let catalog = catalog();
        let mut incremental = ProgressionProfile::new(PlayerId::new().into());
        let x = catalog.get(&"x".into()).unwrap();
        incremental.insert_unlocked(x.id.clone());
        BranchLockManager::on_unlock(&catalog, &mut incremental, x);

        let mut derived = incremental.clone();
        derived.replace_branches(AHashSet::new(), AHashSet::new());
        BranchLockManager::recompute(&catalog, &mut derived);

        assert_eq!(derived.committed_branches(), incremental.committed_branches());
        assert_eq!(derived.locked_branches(), incremental.locked_branches());
    }

    #[test]
    fn test_recompute_ignores_unknown_ids() {
        let catalog = catalog();
        let mut profile = ProgressionProfile::new(PlayerId::new().into());
        profile.insert_unlocked("removed_in_patch".into());
        BranchLockManager::recompute(&catalog, &mut profile);
        assert!(profile.committed_branches().is_empty());
        assert!(profile.locked_branches().is_empty());
    }
}
