//! Server authority and client mirrors
//!
//! One authoritative copy of each profile lives on the server; clients keep
//! read-only mirrors for instant feedback and converge by applying the
//! server's deltas verbatim, falling back to a full snapshot on any doubt.

pub mod authority;
pub mod delta;
pub mod events;
pub mod mirror;
pub mod service;
pub mod store;

pub use authority::{CurrencyAward, ProgressionAuthority};
pub use delta::{BranchUpdate, ProfileDelta, UnlockOutcome, UnlockRequest, UnlockResponse};
pub use events::{ProgressionEvent, UnlockSource};
pub use mirror::{ProfileMirror, Reconcile};
pub use service::{spawn_authority, AuthorityHandle, ClientSession, UnlockAttempt};
pub use store::{MemoryProfileStore, ProfileStore};
