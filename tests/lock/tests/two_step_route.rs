//! Two-step solvable case: root -> R1 {terminal M1, M2}; M2 -> R2 {terminal M3}.

use lock_tests::scenario::{run, terminals, unfiltered, verify_every_step, Table};
use synthplan_search::contract::ConstantEstimator;
use synthplan_search::node::{MolId, MoleculeState, RxnId};
use synthplan_search::report::TerminationReason;
use synthplan_search::route::SynthesisRoute;

const TARGET: &str = "CC(=O)Oc1ccccc1C(=O)O";
const M1: &str = "CC(=O)OC(C)=O";
const M2: &str = "O=C(O)c1ccccc1O";
const M3: &str = "Oc1ccccc1";

fn retro() -> Table {
    Table::new()
        .with(TARGET, &[("CC(=O)OC(C)=O.O=C(O)c1ccccc1O", 0.8)])
        .with(M2, &[(M3, 0.5)])
}

#[test]
fn root_is_solved_after_both_expansions() {
    let set = terminals(&[M1, M3]);
    let table = retro();
    let result = run(TARGET, &set, &table, &table, &ConstantEstimator(2.0), unfiltered(10));
    let report = &result.report;

    assert!(report.solved);
    assert_eq!(report.termination, TerminationReason::Solved);
    assert_eq!(report.steps, 2);
    assert_eq!(report.first_solution_step, Some(1));

    let root = &report.molecules[MolId::ROOT.0];
    assert!(root.has_found);
    // rn(R1) = rn(M1) + rn(M2) = 0 + 0 once R2 solves M2.
    assert!(root.rn.abs() < 1e-12);
    let r1 = &report.reactions[0];
    assert!(r1.rn.abs() < 1e-12);
    assert!(r1.has_found);
    let m2 = report.molecules.iter().find(|m| m.smiles == M2).unwrap();
    assert_eq!(m2.state, MoleculeState::Expanded);
    assert!(m2.rn.abs() < 1e-12);
    assert!(result.violations.is_empty(), "{:?}", result.violations);
}

#[test]
fn intermediate_state_carries_estimate() {
    let set = terminals(&[M1, M3]);
    let table = retro();
    let result = run(TARGET, &set, &table, &table, &ConstantEstimator(2.0), unfiltered(1));
    let report = &result.report;
    assert!(!report.solved);
    assert_eq!(report.termination, TerminationReason::StepBudgetExhausted);
    // Only M2 is unsolved; its estimate is the whole remaining cost.
    assert!((report.molecules[0].rn - 2.0).abs() < 1e-12);
    let m2 = report.molecules.iter().find(|m| m.smiles == M2).unwrap();
    // priority = accumulated cost of R1 + rn(M1) + rn(M2)
    let expected = -(0.8_f64.ln()) + 2.0;
    assert!((m2.priority - expected).abs() < 1e-12, "{}", m2.priority);
}

#[test]
fn accumulated_cost_chains_through_grandparent() {
    let set = terminals(&[M1, M3]);
    let table = retro();
    let result = run(TARGET, &set, &table, &table, &ConstantEstimator(2.0), unfiltered(10));
    let reactions = &result.report.reactions;
    let c1 = -(0.8_f64.ln());
    let c2 = -(0.5_f64.ln());
    assert!((reactions[0].accumulated_cost - c1).abs() < 1e-12);
    assert!((reactions[1].accumulated_cost - (c1 + c2)).abs() < 1e-12);
    assert_eq!(reactions[1].parent, result.report.molecules.iter().find(|m| m.smiles == M2).unwrap().id);
    assert_eq!(reactions[1].id, RxnId(1));
}

#[test]
fn extracted_route_lists_both_reactions() {
    let set = terminals(&[M1, M3]);
    let table = retro();
    let result = run(TARGET, &set, &table, &table, &ConstantEstimator(2.0), unfiltered(10));
    let route = SynthesisRoute::from_report(&result.report).expect("solved");
    assert_eq!(route.steps.len(), 2);
    assert_eq!(route.steps[0].product_smiles, TARGET);
    assert_eq!(route.steps[1].product_smiles, M2);
    assert_eq!(route.starting_materials(), vec![M1, M3]);
    assert!((route.steps[0].probability - 0.8).abs() < 1e-12);
    assert!((route.total_cost() - (-(0.8_f64.ln()) - 0.5_f64.ln())).abs() < 1e-12);
    let text = route.render();
    assert!(text.starts_with("route lock"), "{text}");
    assert!(text.contains(&format!("  {M2} => {M3}*")), "{text}");
}

#[test]
fn every_prefix_is_consistent() {
    let set = terminals(&[M1, M3]);
    let table = retro();
    let steps = verify_every_step(TARGET, &set, &table, &table, &ConstantEstimator(2.0), &unfiltered(10));
    assert_eq!(steps, 2);
}
