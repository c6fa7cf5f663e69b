pub mod config;
pub mod error;
pub mod types;

pub use error::{ProgressionError, Result};
pub use types::{BlessingId, BranchId, Currency, PlayerId, ProfileId, Rank, ReligionId, Scope};
