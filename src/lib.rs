//! Divine Ascension - progression gating for players and religions
//!
//! Favor and prestige accumulate into ranks, ranks gate blessings, blessings
//! form prerequisite graphs with mutually exclusive branches, and a single
//! server authority keeps client mirrors in step.

pub mod blessings;
pub mod core;
pub mod progression;
pub mod sync;
