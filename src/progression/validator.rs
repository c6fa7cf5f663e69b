//! Unlock eligibility and authoritative commit
//!
//! `check_eligibility` is pure and runs identically on a client mirror and on
//! the server profile. `commit_unlock` is the only normal-play path that adds
//! to a profile's unlocked set.

use serde::{Deserialize, Serialize};

use super::branch::BranchLockManager;
use super::profile::ProgressionProfile;
use crate::blessings::{BlessingCatalog, BlessingDefinition};
use crate::core::types::{BlessingId, BranchId, Rank, Scope};
use crate::sync::delta::ProfileDelta;

/// Why a blessing cannot be unlocked right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IneligibleReason {
    NotFound(BlessingId),
    /// Player blessing asked of a religion profile or vice versa
    ScopeMismatch { blessing: Scope, profile: Scope },
    /// Success-shaped: the caller already has what it asked for
    AlreadyUnlocked,
    BranchLocked(BranchId),
    /// First missing prerequisite in definition order
    PrerequisiteUnmet(BlessingId),
    RankInsufficient { have: Rank, need: Rank },
}

impl IneligibleReason {
    pub fn is_already_unlocked(&self) -> bool {
        matches!(self, IneligibleReason::AlreadyUnlocked)
    }
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IneligibleReason::NotFound(id) => write!(f, "no blessing named {}", id),
            IneligibleReason::ScopeMismatch { blessing, profile } => {
                write!(f, "{:?} blessing cannot be unlocked by a {:?} profile", blessing, profile)
            }
            IneligibleReason::AlreadyUnlocked => write!(f, "already unlocked"),
            IneligibleReason::BranchLocked(branch) => {
                write!(f, "branch {} is locked by an earlier choice", branch)
            }
            IneligibleReason::PrerequisiteUnmet(id) => write!(f, "requires {}", id),
            IneligibleReason::RankInsufficient { have, need } => {
                write!(f, "requires rank {} (currently {})", need, have)
            }
        }
    }
}

/// Result of an eligibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eligibility {
    Eligible,
    Ineligible(IneligibleReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    pub fn reason(&self) -> Option<&IneligibleReason> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::Ineligible(reason) => Some(reason),
        }
    }
}

impl From<IneligibleReason> for Eligibility {
    fn from(reason: IneligibleReason) -> Self {
        Eligibility::Ineligible(reason)
    }
}

/// Eligibility checks against one catalog
#[derive(Debug, Clone, Copy)]
pub struct UnlockValidator<'a> {
    catalog: &'a BlessingCatalog,
}

impl<'a> UnlockValidator<'a> {
    pub fn new(catalog: &'a BlessingCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a BlessingCatalog {
        self.catalog
    }

    /// Decide whether `profile` may unlock `id`. Never mutates.
    pub fn check_eligibility(&self, profile: &ProgressionProfile, id: &BlessingId) -> Eligibility {
        match self.check_definition(profile, id) {
            Ok(_) => Eligibility::Eligible,
            Err(reason) => Eligibility::Ineligible(reason),
        }
    }

    fn check_definition(
        &self,
        profile: &ProgressionProfile,
        id: &BlessingId,
    ) -> Result<&'a BlessingDefinition, IneligibleReason> {
        let definition = self
            .catalog
            .get(id)
            .ok_or_else(|| IneligibleReason::NotFound(id.clone()))?;

        if definition.scope != profile.scope() {
            return Err(IneligibleReason::ScopeMismatch {
                blessing: definition.scope,
                profile: profile.scope(),
            });
        }

        if profile.is_unlocked(id) {
            return Err(IneligibleReason::AlreadyUnlocked);
        }

        if let Some(branch) = &definition.branch {
            if profile.is_branch_locked(branch) {
                return Err(IneligibleReason::BranchLocked(branch.clone()));
            }
        }

        // Direct parents only: closure holds transitively for unlocked ids
        if let Some(missing) = definition
            .prerequisites
            .iter()
            .find(|prereq| !profile.is_unlocked(prereq))
        {
            return Err(IneligibleReason::PrerequisiteUnmet(missing.clone()));
        }

        if profile.rank() < definition.required_rank {
            return Err(IneligibleReason::RankInsufficient {
                have: profile.rank(),
                need: definition.required_rank,
            });
        }

        Ok(definition)
    }

    /// Authoritative unlock. On rejection the profile is untouched.
    pub fn commit_unlock(
        &self,
        profile: &mut ProgressionProfile,
        id: &BlessingId,
    ) -> Result<ProfileDelta, IneligibleReason> {
        let definition = self.check_definition(profile, id)?;

        let base_revision = profile.revision();
        profile.insert_unlocked(id.clone());
        let change = BranchLockManager::on_unlock(self.catalog, profile, definition);
        profile.bump_revision();

        Ok(ProfileDelta::unlocked(profile, base_revision, id.clone(), change))
    }

    /// Every blessing of the profile's scope it could unlock right now
    pub fn available(&self, profile: &ProgressionProfile) -> Vec<&'a BlessingDefinition> {
        self.catalog
            .list_by_scope(profile.scope())
            .into_iter()
            .filter(|def| self.check_definition(profile, &def.id).is_ok())
            .collect()
    }
}
