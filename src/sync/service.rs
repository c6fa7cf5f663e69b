//! In-process transport between sessions and the authority
//!
//! Stands in for the network: sessions send commands over an mpsc queue and
//! await a oneshot reply. The queue is processed in order, so commands for a
//! profile are applied in the order they were sent.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::authority::{CurrencyAward, ProgressionAuthority};
use super::delta::{ProfileDelta, UnlockOutcome, UnlockRequest, UnlockResponse};
use super::mirror::{ProfileMirror, Reconcile};
use crate::core::error::{AdminError, ProgressionError, Result};
use crate::core::types::{BlessingId, ProfileId};
use crate::progression::profile::ProfileSnapshot;
use crate::progression::validator::Eligibility;

/// Queue depth before senders wait
const COMMAND_BUFFER: usize = 64;

pub enum AuthorityCommand {
    Unlock {
        request: UnlockRequest,
        reply: oneshot::Sender<UnlockResponse>,
    },
    Snapshot {
        profile: ProfileId,
        reply: oneshot::Sender<ProfileSnapshot>,
    },
    AwardCurrency {
        profile: ProfileId,
        amount: u64,
        reply: oneshot::Sender<CurrencyAward>,
    },
    ForceSet {
        profile: ProfileId,
        blessing: BlessingId,
        unlocked: bool,
        reply: oneshot::Sender<std::result::Result<ProfileDelta, AdminError>>,
    },
}

/// Cloneable sender side of the authority service
#[derive(Clone)]
pub struct AuthorityHandle {
    tx: mpsc::Sender<AuthorityCommand>,
}

/// Start the authority actor on the current tokio runtime
pub fn spawn_authority(authority: Arc<ProgressionAuthority>) -> (AuthorityHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(COMMAND_BUFFER);

    let task = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            // A dropped reply receiver means the caller gave up; nothing to do
            match command {
                AuthorityCommand::Unlock { request, reply } => {
                    let _ = reply.send(authority.handle_unlock(request));
                }
                AuthorityCommand::Snapshot { profile, reply } => {
                    let _ = reply.send(authority.snapshot(profile));
                }
                AuthorityCommand::AwardCurrency {
                    profile,
                    amount,
                    reply,
                } => {
                    let _ = reply.send(authority.award_currency(profile, amount));
                }
                AuthorityCommand::ForceSet {
                    profile,
                    blessing,
                    unlocked,
                    reply,
                } => {
                    let _ = reply.send(authority.force_set_unlocked(profile, &blessing, unlocked));
                }
            }
        }
        tracing::debug!("Authority service stopped");
    });

    (AuthorityHandle { tx }, task)
}

impl AuthorityHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> AuthorityCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| ProgressionError::ServiceClosed)?;
        rx.await.map_err(|_| ProgressionError::ServiceClosed)
    }

    pub async fn unlock(&self, request: UnlockRequest) -> Result<UnlockResponse> {
        self.call(|reply| AuthorityCommand::Unlock { request, reply })
            .await
    }

    pub async fn snapshot(&self, profile: ProfileId) -> Result<ProfileSnapshot> {
        self.call(|reply| AuthorityCommand::Snapshot { profile, reply })
            .await
    }

    pub async fn award_currency(&self, profile: ProfileId, amount: u64) -> Result<CurrencyAward> {
        self.call(|reply| AuthorityCommand::AwardCurrency {
            profile,
            amount,
            reply,
        })
        .await
    }

    pub async fn force_set_unlocked(
        &self,
        profile: ProfileId,
        blessing: BlessingId,
        unlocked: bool,
    ) -> Result<ProfileDelta> {
        let result = self
            .call(|reply| AuthorityCommand::ForceSet {
                profile,
                blessing,
                unlocked,
                reply,
            })
            .await?;
        Ok(result?)
    }
}

/// Outcome of one full unlock round trip, as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockAttempt {
    /// Same blessing already in flight, or mirror refreshing
    Blocked,
    Committed,
    /// Server already holds the blessing; success for idempotent callers
    AlreadyHeld,
    Rejected(crate::progression::validator::IneligibleReason),
    /// Mirror was out of date; it has been rebuilt from a snapshot
    Resynced,
}

/// A client's mirror plus its connection to the authority
pub struct ClientSession {
    handle: AuthorityHandle,
    mirror: ProfileMirror,
}

impl ClientSession {
    /// Open a session and seed the mirror from a snapshot
    pub async fn connect(
        handle: AuthorityHandle,
        catalog: Arc<crate::blessings::BlessingCatalog>,
        profile: ProfileId,
    ) -> Result<Self> {
        let mut mirror = ProfileMirror::awaiting_snapshot(catalog, profile);
        mirror.apply_snapshot(handle.snapshot(profile).await?);
        Ok(Self { handle, mirror })
    }

    pub fn mirror(&self) -> &ProfileMirror {
        &self.mirror
    }

    /// Instant local answer for UI affordances
    pub fn preview(&self, blessing: &BlessingId) -> Option<Eligibility> {
        self.mirror.check(blessing)
    }

    /// Request, await the verdict, reconcile
    pub async fn unlock(&mut self, blessing: BlessingId) -> Result<UnlockAttempt> {
        let Some(request) = self.mirror.request_unlock(blessing) else {
            return Ok(UnlockAttempt::Blocked);
        };
        let request_id = request.request_id;
        let response = match self.handle.unlock(request).await {
            Ok(response) => response,
            Err(e) => {
                self.mirror.abandon(request_id);
                return Err(e);
            }
        };
        let already_held = matches!(
            &response.outcome,
            UnlockOutcome::Rejected(reason) if reason.is_already_unlocked()
        );

        match self.mirror.apply_response(&response) {
            Reconcile::Applied | Reconcile::AlreadyCurrent => Ok(UnlockAttempt::Committed),
            Reconcile::Rejected(_) if already_held => Ok(UnlockAttempt::AlreadyHeld),
            Reconcile::Rejected(reason) => Ok(UnlockAttempt::Rejected(reason)),
            Reconcile::NeedsSnapshot => {
                self.resync().await?;
                if already_held {
                    Ok(UnlockAttempt::AlreadyHeld)
                } else {
                    Ok(UnlockAttempt::Resynced)
                }
            }
        }
    }

    /// Apply a delta pushed by the server, resyncing if it does not fit
    pub async fn receive_delta(&mut self, delta: &ProfileDelta) -> Result<Reconcile> {
        let outcome = self.mirror.apply_delta(delta);
        if outcome == Reconcile::NeedsSnapshot {
            self.resync().await?;
        }
        Ok(outcome)
    }

    /// Discard and rebuild the mirror from a fresh snapshot
    pub async fn resync(&mut self) -> Result<()> {
        self.mirror.discard();
        let snapshot = self.handle.snapshot(self.mirror.profile_id()).await?;
        tracing::info!(profile = %snapshot.id, revision = snapshot.revision, "Mirror resynchronized");
        self.mirror.apply_snapshot(snapshot);
        Ok(())
    }
}
