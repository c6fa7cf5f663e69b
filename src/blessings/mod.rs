//! Blessing definitions and the catalog that holds them
//!
//! Blessings form two parallel graphs: one unlocked per player and gated by
//! favor rank, one unlocked per religion and gated by prestige rank.

pub mod catalog;
pub mod definition;
pub mod loader;

pub use catalog::BlessingCatalog;
pub use definition::{BlessingDefinition, Presentation};
pub use loader::{load_catalog, load_definitions, parse_blessings};
