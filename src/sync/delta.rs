//! Profile deltas and protocol messages
//!
//! The server is the only writer. Every authoritative mutation produces a
//! `ProfileDelta` stamped with the revision it was built on; a mirror applies
//! it verbatim only if it is sitting at exactly that revision.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::core::types::{BlessingId, BranchId, ProfileId, Rank};
use crate::progression::branch::BranchChange;
use crate::progression::profile::ProgressionProfile;
use crate::progression::validator::IneligibleReason;

/// How a delta changes the branch sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchUpdate {
    Unchanged,
    /// Ratchet forward: add to both sets
    Added {
        committed: Vec<BranchId>,
        locked: Vec<BranchId>,
    },
    /// Full replacement after an administrative revoke
    Replaced {
        committed: BTreeSet<BranchId>,
        locked: BTreeSet<BranchId>,
    },
}

/// Minimal state change for one authoritative mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDelta {
    pub profile: ProfileId,
    /// Revision the mirror must be at to apply this
    pub base_revision: u64,
    /// Revision after applying
    pub revision: u64,
    pub currency_total: u64,
    pub rank: Rank,
    pub unlocked_added: Vec<BlessingId>,
    pub unlocked_removed: Vec<BlessingId>,
    pub branches: BranchUpdate,
}

/// Why a delta could not be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaMismatch {
    WrongProfile,
    /// Mirror missed or reordered an earlier delta
    RevisionGap { mirror: u64, base: u64 },
}

impl ProfileDelta {
    fn from_profile(profile: &ProgressionProfile, base_revision: u64) -> Self {
        Self {
            profile: profile.id(),
            base_revision,
            revision: profile.revision(),
            currency_total: profile.currency_total(),
            rank: profile.rank(),
            unlocked_added: Vec::new(),
            unlocked_removed: Vec::new(),
            branches: BranchUpdate::Unchanged,
        }
    }

    /// Delta for a committed or granted unlock
    pub fn unlocked(
        profile: &ProgressionProfile,
        base_revision: u64,
        id: BlessingId,
        change: BranchChange,
    ) -> Self {
        let mut delta = Self::from_profile(profile, base_revision);
        delta.unlocked_added.push(id);
        if !change.is_empty() {
            delta.branches = BranchUpdate::Added {
                committed: change.committed.into_iter().collect(),
                locked: change.newly_locked,
            };
        }
        delta
    }

    /// Delta for an administrative revoke; branches are resent in full
    pub fn revoked(profile: &ProgressionProfile, base_revision: u64, id: BlessingId) -> Self {
        let mut delta = Self::from_profile(profile, base_revision);
        delta.unlocked_removed.push(id);
        delta.branches = BranchUpdate::Replaced {
            committed: profile.committed_branches().iter().cloned().collect(),
            locked: profile.locked_branches().iter().cloned().collect(),
        };
        delta
    }

    /// Delta for a currency award
    pub fn currency(profile: &ProgressionProfile, base_revision: u64) -> Self {
        Self::from_profile(profile, base_revision)
    }

    /// Apply verbatim to a mirror. No local derivation happens here.
    pub(crate) fn apply_to(&self, profile: &mut ProgressionProfile) -> Result<(), DeltaMismatch> {
        if profile.id() != self.profile {
            return Err(DeltaMismatch::WrongProfile);
        }
        if profile.revision() != self.base_revision {
            return Err(DeltaMismatch::RevisionGap {
                mirror: profile.revision(),
                base: self.base_revision,
            });
        }

        profile.set_currency_from_server(self.currency_total, self.rank);
        for id in &self.unlocked_removed {
            profile.remove_unlocked(id);
        }
        for id in &self.unlocked_added {
            profile.insert_unlocked(id.clone());
        }
        match &self.branches {
            BranchUpdate::Unchanged => {}
            BranchUpdate::Added { committed, locked } => {
                for branch in committed {
                    profile.commit_branch(branch.clone());
                }
                for branch in locked {
                    profile.lock_branch(branch.clone());
                }
            }
            BranchUpdate::Replaced { committed, locked } => {
                profile.replace_branches(
                    committed.iter().cloned().collect(),
                    locked.iter().cloned().collect(),
                );
            }
        }
        profile.set_revision(self.revision);
        Ok(())
    }
}

/// Client -> server: "please unlock this"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub request_id: Uuid,
    pub profile: ProfileId,
    pub blessing: BlessingId,
}

impl UnlockRequest {
    pub fn new(profile: ProfileId, blessing: BlessingId) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            profile,
            blessing,
        }
    }
}

/// Terminal result of an unlock request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockOutcome {
    Committed(ProfileDelta),
    Rejected(IneligibleReason),
}

/// Server -> client answer to an `UnlockRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockResponse {
    pub request_id: Uuid,
    pub profile: ProfileId,
    pub blessing: BlessingId,
    pub outcome: UnlockOutcome,
}

impl UnlockResponse {
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, UnlockOutcome::Committed(_))
    }
}
