//! Events emitted by the authority for presentation and effect collaborators

use serde::{Deserialize, Serialize};

use super::delta::ProfileDelta;
use crate::core::types::{BlessingId, ProfileId};
use crate::progression::rank::RankUpEvent;

/// How an unlock came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockSource {
    /// Normal play through the validator
    Play,
    /// Administrative override
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressionEvent {
    RankUp(RankUpEvent),
    UnlockCommitted {
        profile: ProfileId,
        blessing: BlessingId,
        source: UnlockSource,
        delta: ProfileDelta,
    },
    UnlockRevoked {
        profile: ProfileId,
        blessing: BlessingId,
        delta: ProfileDelta,
    },
}

impl ProgressionEvent {
    pub fn profile(&self) -> ProfileId {
        match self {
            ProgressionEvent::RankUp(event) => event.profile,
            ProgressionEvent::UnlockCommitted { profile, .. } => *profile,
            ProgressionEvent::UnlockRevoked { profile, .. } => *profile,
        }
    }
}
