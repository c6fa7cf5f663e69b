//! Client-side speculative mirror of a profile
//!
//! The mirror answers eligibility questions instantly for the UI but never
//! decides anything. It changes only by applying server deltas or snapshots.
//! When the server disagrees with what the mirror predicted, the mirror is
//! thrown away and rebuilt from a fresh snapshot instead of being patched.

use std::sync::Arc;

use ahash::AHashMap;
use uuid::Uuid;

use super::delta::{ProfileDelta, UnlockOutcome, UnlockRequest, UnlockResponse};
use crate::blessings::BlessingCatalog;
use crate::core::types::{BlessingId, ProfileId};
use crate::progression::profile::{ProfileSnapshot, ProgressionProfile};
use crate::progression::validator::{Eligibility, IneligibleReason, UnlockValidator};

/// What happened when server data reached the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconcile {
    /// Delta applied; mirror now matches the server revision
    Applied,
    /// Delta already covered by a newer snapshot
    AlreadyCurrent,
    /// Server refused and the mirror agreed it would
    Rejected(IneligibleReason),
    /// Mirror discarded; fetch a snapshot before trusting it again
    NeedsSnapshot,
}

pub struct ProfileMirror {
    catalog: Arc<BlessingCatalog>,
    profile_id: ProfileId,
    /// `None` while waiting for a snapshot
    state: Option<ProgressionProfile>,
    /// In-flight requests by id
    pending: AHashMap<Uuid, BlessingId>,
}

impl ProfileMirror {
    /// Mirror seeded from a server snapshot
    pub fn new(catalog: Arc<BlessingCatalog>, snapshot: ProfileSnapshot) -> Self {
        Self {
            catalog,
            profile_id: snapshot.id,
            state: Some(ProgressionProfile::from_snapshot(snapshot)),
            pending: AHashMap::new(),
        }
    }

    /// Mirror with no state yet; must receive a snapshot first
    pub fn awaiting_snapshot(catalog: Arc<BlessingCatalog>, profile_id: ProfileId) -> Self {
        Self {
            catalog,
            profile_id,
            state: None,
            pending: AHashMap::new(),
        }
    }

    pub fn profile_id(&self) -> ProfileId {
        self.profile_id
    }

    pub fn profile(&self) -> Option<&ProgressionProfile> {
        self.state.as_ref()
    }

    /// True while the UI should show a refreshing state
    pub fn is_stale(&self) -> bool {
        self.state.is_none()
    }

    pub fn is_pending(&self, blessing: &BlessingId) -> bool {
        self.pending.values().any(|pending| pending == blessing)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Local speculative check; `None` while stale
    pub fn check(&self, blessing: &BlessingId) -> Option<Eligibility> {
        let profile = self.state.as_ref()?;
        Some(UnlockValidator::new(&self.catalog).check_eligibility(profile, blessing))
    }

    /// Build a request for the server. Refuses duplicates of an in-flight
    /// request and anything while stale. Does not touch the mirror state.
    pub fn request_unlock(&mut self, blessing: BlessingId) -> Option<UnlockRequest> {
        if self.is_stale() || self.is_pending(&blessing) {
            return None;
        }
        let request = UnlockRequest::new(self.profile_id, blessing.clone());
        self.pending.insert(request.request_id, blessing);
        Some(request)
    }

    /// Forget a request the transport gave up on so the blessing can be
    /// requested again. A late response for it still reconciles by revision.
    pub fn abandon(&mut self, request_id: Uuid) -> bool {
        self.pending.remove(&request_id).is_some()
    }

    /// Fold a server response into the mirror
    pub fn apply_response(&mut self, response: &UnlockResponse) -> Reconcile {
        self.pending.remove(&response.request_id);

        match &response.outcome {
            UnlockOutcome::Committed(delta) => self.apply_delta(delta),
            UnlockOutcome::Rejected(reason) => {
                let Some(local) = self.check(&response.blessing) else {
                    return Reconcile::NeedsSnapshot;
                };
                let agrees = matches!(&local, Eligibility::Ineligible(l) if l == reason);
                if agrees {
                    Reconcile::Rejected(reason.clone())
                } else {
                    tracing::warn!(
                        profile = %self.profile_id,
                        blessing = %response.blessing,
                        %reason,
                        "Mirror disagreed with server; resynchronizing"
                    );
                    self.discard();
                    Reconcile::NeedsSnapshot
                }
            }
        }
    }

    /// Apply a server delta verbatim
    pub fn apply_delta(&mut self, delta: &ProfileDelta) -> Reconcile {
        let Some(profile) = self.state.as_mut() else {
            return Reconcile::NeedsSnapshot;
        };
        if delta.profile == profile.id() && delta.revision <= profile.revision() {
            return Reconcile::AlreadyCurrent;
        }
        match delta.apply_to(profile) {
            Ok(()) => Reconcile::Applied,
            Err(mismatch) => {
                tracing::warn!(
                    profile = %self.profile_id,
                    ?mismatch,
                    "Delta did not fit mirror; resynchronizing"
                );
                self.discard();
                Reconcile::NeedsSnapshot
            }
        }
    }

    /// Replace the mirror with a fresh server snapshot
    pub fn apply_snapshot(&mut self, snapshot: ProfileSnapshot) {
        if snapshot.id != self.profile_id {
            tracing::warn!(
                expected = %self.profile_id,
                got = %snapshot.id,
                "Ignoring snapshot for another profile"
            );
            return;
        }
        self.pending.clear();
        self.state = Some(ProgressionProfile::from_snapshot(snapshot));
    }

    /// Drop local state and in-flight bookkeeping; the next snapshot rebuilds it
    pub fn discard(&mut self) {
        self.state = None;
        self.pending.clear();
    }
}
