//! Molecules without a usable expansion close permanently with infinite cost.

use lock_tests::scenario::{run, terminals, unfiltered, Table};
use synthplan_search::contract::ConstantEstimator;
use synthplan_search::node::MoleculeState;
use synthplan_search::report::TerminationReason;

#[test]
fn only_path_dead_makes_root_unsolvable() {
    // T -> M; M has no proposals.
    let set = terminals(&[]);
    let table = Table::new().with("T", &[("M", 1.0)]);
    let result = run("T", &set, &table, &table, &ConstantEstimator(1.0), unfiltered(10));
    let report = &result.report;

    assert!(!report.solved);
    assert_eq!(report.termination, TerminationReason::NoOpenNodes);
    assert_eq!(report.steps, 2);
    let m = &report.molecules[1];
    assert_eq!(m.smiles, "M");
    assert_eq!(m.state, MoleculeState::Dead);
    assert!(m.rn.is_infinite());
    assert!(report.reactions[0].rn.is_infinite());
    assert!(report.molecules[0].rn.is_infinite());
    assert!(report.events[1].closed);
    assert!(result.violations.is_empty(), "{:?}", result.violations);
}

#[test]
fn dead_branch_leaves_alternative_intact() {
    // T -> {A (dead end)} or {B} with B -> terminal C.
    let set = terminals(&["C"]);
    let table = Table::new()
        .with("T", &[("A", 0.6), ("B", 0.4)])
        .with("B", &[("C", 1.0)]);
    let result = run("T", &set, &table, &table, &ConstantEstimator(1.0), unfiltered(10));
    let report = &result.report;

    assert!(report.solved);
    let a = report.molecules.iter().find(|m| m.smiles == "A").unwrap();
    assert_eq!(a.state, MoleculeState::Dead);
    assert!(a.rn.is_infinite());
    // The root takes the cheaper, finite branch.
    assert!(report.molecules[0].rn.is_finite());
    assert!((report.molecules[0].rn - 0.0).abs() < 1e-12);
    assert!(result.violations.is_empty(), "{:?}", result.violations);
}

#[test]
fn dead_molecule_is_never_selected_again() {
    let set = terminals(&[]);
    let table = Table::new().with("T", &[("A.B", 1.0)]);
    let result = run("T", &set, &table, &table, &ConstantEstimator(1.0), unfiltered(10));
    let expanded: Vec<&str> = result.report.events.iter().map(|e| e.smiles.as_str()).collect();
    // A dies, which makes the whole AND branch infinite; B is never tried.
    assert_eq!(expanded, vec!["T", "A"]);
    assert_eq!(result.report.termination, TerminationReason::NoOpenNodes);
    let b = result.report.molecules.iter().find(|m| m.smiles == "B").unwrap();
    assert_eq!(b.state, MoleculeState::Open);
    assert!(b.priority.is_infinite());
}

#[test]
fn cycle_candidates_are_dropped_individually() {
    // T -> X; X proposes T back (cycle) and Y (terminal).
    let set = terminals(&["Y"]);
    let table = Table::new()
        .with("T", &[("X", 1.0)])
        .with("X", &[("T.Y", 0.7), ("Y", 0.3)]);
    let result = run("T", &set, &table, &table, &ConstantEstimator(1.0), unfiltered(10));
    assert!(result.report.solved);
    let json = result.report.to_json_value();
    let outcomes = &json["events"][1]["candidates"];
    assert_eq!(outcomes[0]["outcome"]["type"], "rejected_cycle");
    assert_eq!(outcomes[0]["outcome"]["molecule"], "T");
    assert_eq!(outcomes[1]["outcome"]["type"], "accepted");
    assert!(result.violations.is_empty(), "{:?}", result.violations);
}

#[test]
fn all_candidates_cyclic_closes_molecule() {
    let set = terminals(&[]);
    let table = Table::new()
        .with("T", &[("X", 1.0)])
        .with("X", &[("T", 1.0)]);
    let result = run("T", &set, &table, &table, &ConstantEstimator(1.0), unfiltered(10));
    assert!(!result.report.solved);
    assert!(result.report.events[1].closed);
    assert_eq!(result.report.termination, TerminationReason::NoOpenNodes);
}

#[test]
fn dead_uncle_stops_expansion_below_its_sibling() {
    // T -> {B, A}; B -> C; A has no proposals; C -> D.
    let set = terminals(&[]);
    let table = Table::new()
        .with("T", &[("B.A", 1.0)])
        .with("B", &[("C", 1.0)])
        .with("C", &[("D", 1.0)]);
    let result = run("T", &set, &table, &table, &ConstantEstimator(1.0), unfiltered(10));
    let report = &result.report;

    // After B expands, C carries rn(C) plus rn(B) + rn(A) from the level
    // above, so the cheaper A is expanded next. Once A dies, C is unreachable.
    let expanded: Vec<&str> = report.events.iter().map(|e| e.smiles.as_str()).collect();
    assert_eq!(expanded, vec!["T", "B", "A"]);
    assert_eq!(report.termination, TerminationReason::NoOpenNodes);
    let c = report.molecules.iter().find(|m| m.smiles == "C").unwrap();
    assert_eq!(c.state, MoleculeState::Open);
    assert!(c.priority.is_infinite());
    assert!(result.violations.is_empty(), "{:?}", result.violations);
}
