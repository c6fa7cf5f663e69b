//! Core type definitions used throughout the codebase

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for religions (player groups)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReligionId(pub Uuid);

impl ReligionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReligionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a blessing definition, unique within a catalog
#[derive(
    Debug, Display, From, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlessingId(pub String);

impl BlessingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlessingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Branch tag shared by alternative nodes of one path
#[derive(
    Debug, Display, From, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BranchId(pub String);

impl BranchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BranchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which graph a blessing belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Unlocked per player, gated by favor rank
    Player,
    /// Unlocked per religion, gated by prestige rank
    Religion,
}

impl Scope {
    /// Currency whose rank gates blessings of this scope
    pub fn currency(&self) -> Currency {
        match self {
            Scope::Player => Currency::Favor,
            Scope::Religion => Currency::Prestige,
        }
    }
}

/// The two independent progression currencies
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Favor,
    Prestige,
}

/// Owner of a progression profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProfileId {
    Player(PlayerId),
    Religion(ReligionId),
}

impl ProfileId {
    pub fn scope(&self) -> Scope {
        match self {
            ProfileId::Player(_) => Scope::Player,
            ProfileId::Religion(_) => Scope::Religion,
        }
    }

    pub fn currency(&self) -> Currency {
        self.scope().currency()
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileId::Player(id) => write!(f, "player:{}", id.0),
            ProfileId::Religion(id) => write!(f, "religion:{}", id.0),
        }
    }
}

impl From<PlayerId> for ProfileId {
    fn from(id: PlayerId) -> Self {
        ProfileId::Player(id)
    }
}

impl From<ReligionId> for ProfileId {
    fn from(id: ReligionId) -> Self {
        ProfileId::Religion(id)
    }
}

/// Index into a rank table (0 = lowest rank)
pub type Rank = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_currency_mapping() {
        assert_eq!(Scope::Player.currency(), Currency::Favor);
        assert_eq!(Scope::Religion.currency(), Currency::Prestige);
    }

    #[test]
    fn test_profile_id_scope() {
        let player: ProfileId = PlayerId::new().into();
        let religion: ProfileId = ReligionId::new().into();
        assert_eq!(player.scope(), Scope::Player);
        assert_eq!(religion.currency(), Currency::Prestige);
    }

    #[test]
    fn test_blessing_id_display() {
        let id = BlessingId::from("divine_strike");
        assert_eq!(id.to_string(), "divine_strike");
        assert_eq!(id.as_str(), "divine_strike");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = BranchId::new("fire");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"fire\"");
    }
}
