//! Property tests: random catalogs driven by random award/unlock sequences

use std::sync::Arc;

use proptest::prelude::*;

use divine_ascension::blessings::{BlessingCatalog, BlessingDefinition};
use divine_ascension::core::types::{BlessingId, Currency, PlayerId, ProfileId, Scope};
use divine_ascension::progression::{RankEntry, RankProgressionTracker, RankTable};
use divine_ascension::sync::{ProfileMirror, ProgressionAuthority, Reconcile, UnlockRequest};

const NODES: usize = 10;
const BRANCHES: [&str; 4] = ["fire", "ice", "storm", "stone"];

#[derive(Debug, Clone)]
enum Op {
    Award(u64),
    Unlock(usize),
}

fn tracker() -> RankProgressionTracker {
    let table = RankTable::new(vec![
        RankEntry::new("R0", 0),
        RankEntry::new("R1", 100),
        RankEntry::new("R2", 500),
        RankEntry::new("R3", 2_000),
    ])
    .unwrap_or_else(|e| panic!("rank table invalid: {e}"));
    RankProgressionTracker::new(table.clone(), table)
}

fn node_id(index: usize) -> BlessingId {
    BlessingId::new(format!("n{index}"))
}

/// Prerequisites only point at lower indices, so the graph is acyclic
fn definition_strategy(index: usize) -> impl Strategy<Value = BlessingDefinition> {
    (
        0u32..4,
        prop::collection::vec(0..index.max(1), 0..=index.min(2)),
        prop::option::of(0..BRANCHES.len()),
        prop::collection::vec(0..BRANCHES.len(), 0..2),
    )
        .prop_map(move |(rank, prereqs, branch, excluded)| {
            let mut def = BlessingDefinition::new(node_id(index), Scope::Player).with_rank(rank);
            if index > 0 {
                let mut prereqs = prereqs;
                prereqs.sort_unstable();
                prereqs.dedup();
                for p in prereqs {
                    def = def.with_prerequisite(node_id(p));
                }
            }
            if let Some(b) = branch {
                def = def.with_branch(BRANCHES[b]);
                for e in excluded {
                    if e != b {
                        def = def.excluding(BRANCHES[e]);
                    }
                }
            }
            def
        })
}

fn catalog_strategy() -> impl Strategy<Value = Arc<BlessingCatalog>> {
    (0..NODES)
        .map(definition_strategy)
        .collect::<Vec<_>>()
        .prop_map(|defs| {
            Arc::new(
                BlessingCatalog::new(defs)
                    .unwrap_or_else(|e| panic!("generated catalog invalid: {e}")),
            )
        })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..800).prop_map(Op::Award),
        (0..NODES).prop_map(Op::Unlock),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn progression_invariants_hold(
        catalog in catalog_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let tracker = tracker();
        let authority = ProgressionAuthority::new(catalog.clone(), tracker.clone());
        let id: ProfileId = PlayerId::new().into();
        let mut mirror = ProfileMirror::new(catalog.clone(), authority.snapshot(id));

        for op in ops {
            let before = authority.snapshot(id);

            let delta = match op {
                Op::Award(amount) => Some(authority.award_currency(id, amount).delta),
                Op::Unlock(index) => {
                    let blessing = node_id(index);
                    let predicted = authority.check_eligibility(id, &blessing);
                    let response = authority.handle_unlock(UnlockRequest::new(id, blessing));
                    // Check and commit run the same predicate
                    prop_assert_eq!(predicted.is_eligible(), response.is_committed());
                    match response.outcome {
                        divine_ascension::sync::UnlockOutcome::Committed(delta) => Some(delta),
                        divine_ascension::sync::UnlockOutcome::Rejected(_) => None,
                    }
                }
            };

            let after = authority.snapshot(id);

            // Currency, rank and unlocks only ratchet forward
            prop_assert!(after.currency_total >= before.currency_total);
            prop_assert!(after.rank >= before.rank);
            prop_assert!(after.unlocked.is_superset(&before.unlocked));
            prop_assert!(after.locked_branches.is_superset(&before.locked_branches));

            // Rank is a pure function of the total
            prop_assert_eq!(after.rank, tracker.compute_rank(Currency::Favor, after.currency_total));

            // Every unlocked blessing has its prerequisites unlocked
            for blessing in &after.unlocked {
                let def = catalog.get(blessing).unwrap_or_else(|| panic!("unknown {blessing}"));
                for prereq in &def.prerequisites {
                    prop_assert!(after.unlocked.contains(prereq));
                }
            }

            // No two committed branches exclude each other, none is locked
            for a in &after.committed_branches {
                prop_assert!(!after.locked_branches.contains(a));
                for b in &after.committed_branches {
                    prop_assert!(!catalog.are_exclusive(a, b));
                }
            }

            // A mirror fed every delta in order stays identical
            if let Some(delta) = delta {
                let reconcile = mirror.apply_delta(&delta);
                prop_assert!(matches!(reconcile, Reconcile::Applied | Reconcile::AlreadyCurrent));
            }
            let mirrored = mirror.profile().map(|p| p.snapshot());
            prop_assert_eq!(mirrored, Some(after));
        }
    }

    #[test]
    fn rank_is_monotone_in_total(a in 0u64..5_000, b in 0u64..5_000) {
        let tracker = tracker();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            tracker.compute_rank(Currency::Favor, low) <= tracker.compute_rank(Currency::Favor, high)
        );
    }
}
