//! Progression profiles and the rules that gate them
//!
//! Currency flows into ranks, ranks and prerequisites gate blessings, and
//! branch choices close off competing paths for good.

pub mod branch;
pub mod profile;
pub mod rank;
pub mod validator;

pub use branch::{BranchChange, BranchLockManager};
pub use profile::{CurrencyChange, ProfileSnapshot, ProgressionProfile};
pub use rank::{RankEntry, RankProgress, RankProgressionTracker, RankTable, RankUpEvent};
pub use validator::{Eligibility, IneligibleReason, UnlockValidator};
