//! Whole-tree invariants checked after every step of larger searches.
//!
//! - molecule `rn` is the min over child reactions, reaction `rn` the sum
//!   over child molecules;
//! - `has_found` follows the AND/OR rules;
//! - no accepted reactant repeats an ancestor;
//! - refreshing priorities twice changes nothing.

use lock_tests::scenario::{terminals, unfiltered, verify_every_step, Table};
use synthplan_search::contract::{ConstantEstimator, ValueEstimator};
use synthplan_search::policy::SearchPolicy;

/// Cost estimate derived from the SMILES length, so siblings differ.
struct LengthEstimator;

impl ValueEstimator for LengthEstimator {
    #[allow(clippy::cast_precision_loss)]
    fn estimate(&self, molecules: &[String]) -> Vec<f64> {
        molecules.iter().map(|m| m.len() as f64 * 0.25).collect()
    }
}

fn branching_table() -> Table {
    Table::new()
        .with("T", &[("P.Q", 0.5), ("R", 0.3), ("S.U", 0.2)])
        .with("P", &[("PA.PB", 0.6), ("T", 0.4)])
        .with("Q", &[("QA", 0.9), ("QB", 0.1)])
        .with("R", &[("RR.Q", 0.7), ("P", 0.3)])
        .with("S", &[("SA", 1.0)])
        .with("U", &[("UA.UB.UC", 1.0)])
        .with("PB", &[("PBA", 1.0)])
        .with("QB", &[("Q", 1.0)])
        .with("RR", &[("R", 1.0)])
}

#[test]
fn branching_search_keeps_invariants() {
    let set = terminals(&["PA", "QA", "SA", "UA", "UB"]);
    let table = branching_table();
    let policy = SearchPolicy {
        early_stop: None,
        ..unfiltered(25)
    };
    let steps = verify_every_step("T", &set, &table, &table, &LengthEstimator, &policy);
    assert!(steps > 3, "search ended after {steps} step(s)");
}

#[test]
fn unsolvable_search_keeps_invariants() {
    let set = terminals(&[]);
    let table = branching_table();
    let steps = verify_every_step("T", &set, &table, &table, &ConstantEstimator(0.5), &unfiltered(40));
    assert!(steps > 0);
}

#[test]
fn filtered_search_keeps_invariants() {
    let set = terminals(&["PA", "QA", "SA", "UA", "UB", "UC", "PBA"]);
    let retro = branching_table();
    let forward = Table::new()
        .with("P.Q", &[("T", 0.9)])
        .with("R", &[("T", 0.02)])
        .with("S.U", &[("T", 0.5)])
        .with("PA.PB", &[("P", 0.7)])
        .with("QA", &[("Q", 1.0)])
        .with("QB", &[("Q", 0.3)]);
    let policy = SearchPolicy {
        max_steps: 30,
        early_stop: None,
        lower_bound: 0.05,
        consistency_check: true,
        check_lower_bound: 0.05,
        ..SearchPolicy::default()
    };
    let steps = verify_every_step("T", &set, &retro, &forward, &LengthEstimator, &policy);
    assert!(steps > 0);
}
