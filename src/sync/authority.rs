//! Server-side authority over progression profiles
//!
//! The authority owns every profile and is the only writer. Each profile sits
//! behind its own mutex so check-then-commit for one profile never
//! interleaves, while different profiles proceed in parallel. The table lock
//! is only held long enough to find or create a profile entry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use tokio::sync::broadcast;

use super::delta::{ProfileDelta, UnlockOutcome, UnlockRequest, UnlockResponse};
use super::events::{ProgressionEvent, UnlockSource};
use super::store::{MemoryProfileStore, ProfileStore};
use crate::blessings::BlessingCatalog;
use crate::core::config::ProgressionConfig;
use crate::core::error::AdminError;
use crate::core::types::{BlessingId, ProfileId};
use crate::progression::branch::BranchLockManager;
use crate::progression::profile::{ProfileSnapshot, ProgressionProfile};
use crate::progression::rank::{RankProgress, RankProgressionTracker, RankUpEvent};
use crate::progression::validator::{Eligibility, UnlockValidator};

/// Capacity of the event broadcast buffer
const EVENT_CAPACITY: usize = 256;

/// Result of awarding currency to a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyAward {
    pub delta: ProfileDelta,
    pub rank_up: Option<RankUpEvent>,
}

type SharedProfile = Arc<Mutex<ProgressionProfile>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ProgressionAuthority {
    catalog: Arc<BlessingCatalog>,
    tracker: RankProgressionTracker,
    /// 0 = uncapped
    max_award: u64,
    profiles: Mutex<AHashMap<ProfileId, SharedProfile>>,
    store: Arc<dyn ProfileStore>,
    events: broadcast::Sender<ProgressionEvent>,
}

impl ProgressionAuthority {
    pub fn new(catalog: Arc<BlessingCatalog>, tracker: RankProgressionTracker) -> Self {
        Self::with_store(catalog, tracker, Arc::new(MemoryProfileStore::new()))
    }

    pub fn with_store(
        catalog: Arc<BlessingCatalog>,
        tracker: RankProgressionTracker,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog,
            tracker,
            max_award: 0,
            profiles: Mutex::new(AHashMap::new()),
            store,
            events,
        }
    }

    pub fn from_config(
        config: &ProgressionConfig,
        catalog: Arc<BlessingCatalog>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        let mut authority = Self::with_store(catalog, config.tracker(), store);
        authority.max_award = config.max_award;
        authority
    }

    pub fn catalog(&self) -> &Arc<BlessingCatalog> {
        &self.catalog
    }

    pub fn tracker(&self) -> &RankProgressionTracker {
        &self.tracker
    }

    /// Receive rank-up, unlock and revoke events
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ProgressionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Find the profile entry, loading or creating it on first reference.
    ///
    /// The store is read outside the table lock; if two callers race on a
    /// first reference, the first insert wins and the other load is dropped.
    fn entry(&self, id: ProfileId) -> SharedProfile {
        if let Some(shared) = lock(&self.profiles).get(&id) {
            return shared.clone();
        }
        let loaded = self.load_profile(id);
        lock(&self.profiles)
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(loaded)))
            .clone()
    }

    fn load_profile(&self, id: ProfileId) -> ProgressionProfile {
        match self.store.load(&id) {
            Some(snapshot) => {
                // Stored state may predate the current catalog or rank tables
                let profile = ProgressionProfile::restore(snapshot, &self.tracker, &self.catalog);
                tracing::debug!(profile = %id, revision = profile.revision(), "Profile loaded");
                profile
            }
            None => {
                tracing::debug!(profile = %id, "Profile created");
                ProgressionProfile::new(id)
            }
        }
    }

    /// Run `f` inside the profile's exclusive section
    fn with_profile<R>(&self, id: ProfileId, f: impl FnOnce(&mut ProgressionProfile) -> R) -> R {
        let shared = self.entry(id);
        let mut profile = lock(&shared);
        f(&mut profile)
    }

    /// Full current state for mirror (re)synchronization
    pub fn snapshot(&self, id: ProfileId) -> ProfileSnapshot {
        self.with_profile(id, |profile| profile.snapshot())
    }

    /// Server-side eligibility, same predicate the mirrors run
    pub fn check_eligibility(&self, id: ProfileId, blessing: &BlessingId) -> Eligibility {
        let validator = UnlockValidator::new(&self.catalog);
        self.with_profile(id, |profile| validator.check_eligibility(profile, blessing))
    }

    pub fn progress(&self, id: ProfileId) -> RankProgress {
        self.with_profile(id, |profile| {
            self.tracker.progress(profile.currency(), profile.currency_total())
        })
    }

    /// Validate and commit an unlock request
    pub fn handle_unlock(&self, request: UnlockRequest) -> UnlockResponse {
        let validator = UnlockValidator::new(&self.catalog);
        // Events go out under the profile lock so subscribers see revisions in order
        let outcome = self.with_profile(request.profile, |profile| {
            match validator.commit_unlock(profile, &request.blessing) {
                Ok(delta) => {
                    self.store.save(&profile.snapshot());
                    tracing::info!(
                        profile = %request.profile,
                        blessing = %request.blessing,
                        revision = delta.revision,
                        "Blessing unlocked"
                    );
                    self.emit(ProgressionEvent::UnlockCommitted {
                        profile: request.profile,
                        blessing: request.blessing.clone(),
                        source: UnlockSource::Play,
                        delta: delta.clone(),
                    });
                    UnlockOutcome::Committed(delta)
                }
                Err(reason) => {
                    tracing::debug!(
                        profile = %request.profile,
                        blessing = %request.blessing,
                        %reason,
                        "Unlock rejected"
                    );
                    UnlockOutcome::Rejected(reason)
                }
            }
        });

        UnlockResponse {
            request_id: request.request_id,
            profile: request.profile,
            blessing: request.blessing,
            outcome,
        }
    }

    /// Add favor or prestige (by profile kind) and report any rank-up
    pub fn award_currency(&self, id: ProfileId, amount: u64) -> CurrencyAward {
        let amount = if self.max_award > 0 && amount > self.max_award {
            tracing::warn!(profile = %id, amount, cap = self.max_award, "Currency award capped");
            self.max_award
        } else {
            amount
        };

        self.with_profile(id, |profile| {
            let base_revision = profile.revision();
            if amount == 0 {
                return CurrencyAward {
                    delta: ProfileDelta::currency(profile, base_revision),
                    rank_up: None,
                };
            }
            let change = profile.add_currency(amount, &self.tracker);
            profile.bump_revision();
            self.store.save(&profile.snapshot());

            let rank_up = self
                .tracker
                .detect_rank_up(id, change.previous_rank, change.new_rank);
            if let Some(event) = &rank_up {
                tracing::info!(
                    profile = %id,
                    currency = %event.currency,
                    from = event.previous_rank,
                    to = event.new_rank,
                    rank = %event.new_rank_name,
                    "Rank up"
                );
                self.emit(ProgressionEvent::RankUp(event.clone()));
            }

            CurrencyAward {
                delta: ProfileDelta::currency(profile, base_revision),
                rank_up,
            }
        })
    }

    /// Administrative grant or revoke, ignoring rank and prerequisites.
    ///
    /// Revokes do not cascade: dependents stay unlocked even though their
    /// prerequisite is gone.
    pub fn force_set_unlocked(
        &self,
        id: ProfileId,
        blessing: &BlessingId,
        unlocked: bool,
    ) -> Result<ProfileDelta, AdminError> {
        let definition = self
            .catalog
            .get(blessing)
            .ok_or_else(|| AdminError::NotFound(blessing.clone()))?;
        if definition.scope != id.scope() {
            return Err(AdminError::ScopeMismatch {
                blessing: blessing.clone(),
                scope: definition.scope,
                profile: id.scope(),
            });
        }

        self.with_profile(id, |profile| {
            let base_revision = profile.revision();

            if unlocked {
                if profile.is_unlocked(blessing) {
                    return Ok(ProfileDelta::currency(profile, base_revision));
                }
                if let Some(branch) = &definition.branch {
                    if profile.is_branch_locked(branch) {
                        return Err(AdminError::BranchLocked {
                            blessing: blessing.clone(),
                            branch: branch.clone(),
                        });
                    }
                }
                profile.insert_unlocked(blessing.clone());
                let change = BranchLockManager::on_unlock(&self.catalog, profile, definition);
                profile.bump_revision();
                self.store.save(&profile.snapshot());

                let delta = ProfileDelta::unlocked(profile, base_revision, blessing.clone(), change);
                tracing::info!(profile = %id, blessing = %blessing, "Admin grant applied");
                self.emit(ProgressionEvent::UnlockCommitted {
                    profile: id,
                    blessing: blessing.clone(),
                    source: UnlockSource::Admin,
                    delta: delta.clone(),
                });
                Ok(delta)
            } else {
                if !profile.remove_unlocked(blessing) {
                    return Ok(ProfileDelta::currency(profile, base_revision));
                }
                BranchLockManager::recompute(&self.catalog, profile);
                profile.bump_revision();
                self.store.save(&profile.snapshot());

                let dangling: Vec<&BlessingId> = self
                    .catalog
                    .dependents_of(blessing)
                    .iter()
                    .filter(|dep| profile.is_unlocked(dep))
                    .collect();
                if !dangling.is_empty() {
                    tracing::warn!(
                        profile = %id,
                        blessing = %blessing,
                        ?dangling,
                        "Revoked blessing still has unlocked dependents"
                    );
                }

                let delta = ProfileDelta::revoked(profile, base_revision, blessing.clone());
                tracing::info!(profile = %id, blessing = %blessing, "Admin revoke applied");
                self.emit(ProgressionEvent::UnlockRevoked {
                    profile: id,
                    blessing: blessing.clone(),
                    delta: delta.clone(),
                });
                Ok(delta)
            }
        })
    }
}
