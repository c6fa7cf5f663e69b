//! Blessing catalog
//!
//! The catalog is built once from validated definitions and is read-only
//! afterwards. Construction refuses any input that could later produce an
//! illegal profile: unknown or cross-scope prerequisites, prerequisite
//! cycles, and self-contradictory branch exclusions.

use ahash::AHashMap;
use std::collections::BTreeSet;

use super::definition::BlessingDefinition;
use crate::core::error::CatalogError;
use crate::core::types::{BlessingId, BranchId, Scope};

/// Read-only table of every blessing definition
#[derive(Debug, Clone, Default)]
pub struct BlessingCatalog {
    /// Definitions in input order
    definitions: Vec<BlessingDefinition>,
    /// Id -> index into `definitions`
    by_id: AHashMap<BlessingId, usize>,
    /// Prerequisite id -> direct dependents
    dependents: AHashMap<BlessingId, Vec<BlessingId>>,
    /// Branch -> branches it can never coexist with (symmetric)
    exclusions: AHashMap<BranchId, BTreeSet<BranchId>>,
}

impl BlessingCatalog {
    /// Validate and index a set of definitions
    pub fn new(definitions: Vec<BlessingDefinition>) -> Result<Self, CatalogError> {
        let mut by_id = AHashMap::with_capacity(definitions.len());
        for (index, def) in definitions.iter().enumerate() {
            if def.id.as_str().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if by_id.insert(def.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(def.id.clone()));
            }
        }

        let mut dependents: AHashMap<BlessingId, Vec<BlessingId>> = AHashMap::new();
        let mut exclusions: AHashMap<BranchId, BTreeSet<BranchId>> = AHashMap::new();

        for def in &definitions {
            for prereq in &def.prerequisites {
                let Some(&prereq_index) = by_id.get(prereq) else {
                    return Err(CatalogError::UnknownPrerequisite {
                        blessing: def.id.clone(),
                        missing: prereq.clone(),
                    });
                };
                if definitions[prereq_index].scope != def.scope {
                    return Err(CatalogError::CrossScopePrerequisite {
                        blessing: def.id.clone(),
                        prerequisite: prereq.clone(),
                    });
                }
                dependents
                    .entry(prereq.clone())
                    .or_default()
                    .push(def.id.clone());
            }

            match &def.branch {
                Some(branch) => {
                    for excluded in &def.exclusive_branches {
                        if excluded == branch {
                            return Err(CatalogError::SelfExclusiveBranch {
                                blessing: def.id.clone(),
                                branch: branch.clone(),
                            });
                        }
                        exclusions
                            .entry(branch.clone())
                            .or_default()
                            .insert(excluded.clone());
                        exclusions
                            .entry(excluded.clone())
                            .or_default()
                            .insert(branch.clone());
                    }
                }
                None if !def.exclusive_branches.is_empty() => {
                    return Err(CatalogError::ExclusionWithoutBranch(def.id.clone()));
                }
                None => {}
            }
        }

        if let Some(cycle) = find_cycle(&definitions, &by_id) {
            return Err(CatalogError::PrerequisiteCycle(cycle));
        }

        Ok(Self {
            definitions,
            by_id,
            dependents,
            exclusions,
        })
    }

    /// Get a definition by id
    pub fn get(&self, id: &BlessingId) -> Option<&BlessingDefinition> {
        self.by_id.get(id).map(|&i| &self.definitions[i])
    }

    pub fn contains(&self, id: &BlessingId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All definitions of one scope, in input order
    pub fn list_by_scope(&self, scope: Scope) -> Vec<&BlessingDefinition> {
        self.definitions
            .iter()
            .filter(|def| def.scope == scope)
            .collect()
    }

    /// Blessings that list `id` as a direct prerequisite
    pub fn dependents_of(&self, id: &BlessingId) -> &[BlessingId] {
        self.dependents.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Branches that can never be committed alongside `branch`
    pub fn exclusions(&self, branch: &BranchId) -> impl Iterator<Item = &BranchId> {
        self.exclusions.get(branch).into_iter().flatten()
    }

    /// Whether two branches exclude each other
    pub fn are_exclusive(&self, a: &BranchId, b: &BranchId) -> bool {
        self.exclusions.get(a).map_or(false, |set| set.contains(b))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlessingDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Iterative DFS over prerequisite edges; returns one cycle path if present
fn find_cycle(
    definitions: &[BlessingDefinition],
    by_id: &AHashMap<BlessingId, usize>,
) -> Option<Vec<BlessingId>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; definitions.len()];

    for root in 0..definitions.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        // (node, next prerequisite to explore)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::OnStack;

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let prereqs = &definitions[node].prerequisites;
            if top.1 < prereqs.len() {
                let child = by_id[&prereqs[top.1]];
                top.1 += 1;
                match marks[child] {
                    Mark::Unvisited => {
                        marks[child] = Mark::OnStack;
                        stack.push((child, 0));
                    }
                    Mark::OnStack => {
                        let start = stack.iter().position(|&(n, _)| n == child).unwrap_or(0);
                        let mut path: Vec<BlessingId> = stack[start..]
                            .iter()
                            .map(|&(n, _)| definitions[n].id.clone())
                            .collect();
                        path.push(definitions[child].id.clone());
                        return Some(path);
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }

    None
}
