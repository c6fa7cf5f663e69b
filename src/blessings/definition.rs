//! Blessing definitions
//!
//! A blessing is one node of a progression graph. The engine only reads the
//! gating fields (scope, rank, prerequisites, branch data); everything else
//! is carried through untouched for presentation and effect collaborators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{BlessingId, BranchId, Rank, Scope};

/// Immutable definition of a single blessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlessingDefinition {
    /// Unique identifier
    pub id: BlessingId,
    /// Player or religion graph
    pub scope: Scope,
    /// Minimum rank in the scope's currency
    #[serde(default)]
    pub required_rank: Rank,
    /// Blessings that must already be unlocked, same scope only
    #[serde(default)]
    pub prerequisites: Vec<BlessingId>,
    /// Path this node belongs to, if any
    #[serde(default)]
    pub branch: Option<BranchId>,
    /// Branches foreclosed once this node's branch is committed
    #[serde(default)]
    pub exclusive_branches: Vec<BranchId>,
    #[serde(flatten)]
    pub presentation: Presentation,
}

/// Fields the engine never interprets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Stat name -> modifier, applied by the effect collaborator
    #[serde(default)]
    pub stat_modifiers: BTreeMap<String, f32>,
    #[serde(default)]
    pub special_effects: Vec<String>,
}

impl BlessingDefinition {
    /// Minimal definition, mostly for tests and tooling
    pub fn new(id: impl Into<BlessingId>, scope: Scope) -> Self {
        let id = id.into();
        Self {
            presentation: Presentation {
                name: id.to_string(),
                ..Presentation::default()
            },
            id,
            scope,
            required_rank: 0,
            prerequisites: Vec::new(),
            branch: None,
            exclusive_branches: Vec::new(),
        }
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.required_rank = rank;
        self
    }

    pub fn with_prerequisite(mut self, id: impl Into<BlessingId>) -> Self {
        self.prerequisites.push(id.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<BranchId>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn excluding(mut self, branch: impl Into<BranchId>) -> Self {
        self.exclusive_branches.push(branch.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.presentation.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let def = BlessingDefinition::new("flame_lance", Scope::Player)
            .with_rank(2)
            .with_prerequisite("ember")
            .with_branch("fire")
            .excluding("ice");

        assert_eq!(def.required_rank, 2);
        assert_eq!(def.prerequisites, vec![BlessingId::from("ember")]);
        assert_eq!(def.branch, Some(BranchId::from("fire")));
        assert_eq!(def.exclusive_branches, vec![BranchId::from("ice")]);
        assert_eq!(def.name(), "flame_lance");
    }

    #[test]
    fn test_presentation_fields_pass_through() {
        let toml_src = r#"
            id = "hunters_mark"
            scope = "player"
            required_rank = 1
            name = "Hunter's Mark"
            description = "Marked prey takes more damage"
            cost = 3
            tags = ["hunt"]
            special_effects = ["mark_target"]

            [stat_modifiers]
            ranged_damage = 0.1
        "#;
        let def: BlessingDefinition = toml::from_str(toml_src).unwrap();
        assert_eq!(def.scope, Scope::Player);
        assert_eq!(def.presentation.name, "Hunter's Mark");
        assert_eq!(def.presentation.cost, 3);
        assert_eq!(def.presentation.stat_modifiers.get("ranged_damage"), Some(&0.1));
        assert!(def.branch.is_none());
    }
}
