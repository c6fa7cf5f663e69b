use thiserror::Error;

use crate::core::types::{BlessingId, BranchId};

/// Fatal problems found while building a blessing catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Blessing with empty id")]
    EmptyId,

    #[error("Duplicate blessing id: {0}")]
    DuplicateId(BlessingId),

    #[error("Blessing {blessing} requires unknown prerequisite {missing}")]
    UnknownPrerequisite {
        blessing: BlessingId,
        missing: BlessingId,
    },

    #[error("Blessing {blessing} requires {prerequisite} from another scope")]
    CrossScopePrerequisite {
        blessing: BlessingId,
        prerequisite: BlessingId,
    },

    #[error("Prerequisite cycle: {}", format_cycle(.0))]
    PrerequisiteCycle(Vec<BlessingId>),

    #[error("Blessing {blessing} excludes its own branch {branch}")]
    SelfExclusiveBranch {
        blessing: BlessingId,
        branch: BranchId,
    },

    #[error("Blessing {0} declares exclusive branches but has no branch")]
    ExclusionWithoutBranch(BlessingId),
}

fn format_cycle(path: &[BlessingId]) -> String {
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Invalid rank threshold table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankTableError {
    #[error("Rank table is empty")]
    Empty,

    #[error("First rank threshold must be 0, got {0}")]
    NonZeroBase(u64),

    #[error("Rank thresholds must strictly increase: '{rank}' at {threshold} follows {previous}")]
    NotIncreasing {
        rank: String,
        threshold: u64,
        previous: u64,
    },
}

/// Errors loading configuration or blessing definitions from disk
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Rejections of administrative overrides, surfaced to the operator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("Blessing not found: {0}")]
    NotFound(BlessingId),

    #[error("Blessing {blessing} belongs to {scope:?} scope, profile is {profile:?}")]
    ScopeMismatch {
        blessing: BlessingId,
        scope: crate::core::types::Scope,
        profile: crate::core::types::Scope,
    },

    #[error("Blessing {blessing} is in branch {branch}, which is locked on this profile")]
    BranchLocked {
        blessing: BlessingId,
        branch: BranchId,
    },
}

#[derive(Error, Debug)]
pub enum ProgressionError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Rank table error: {0}")]
    RankTable(#[from] RankTableError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    #[error("Authority service unavailable")]
    ServiceClosed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProgressionError>;
