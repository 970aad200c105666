//! A target that is already purchasable is solved without any expansion.

use lock_tests::scenario::{run, terminals, unfiltered, Table};
use synthplan_search::contract::{ConstantEstimator, ValueEstimator};
use synthplan_search::report::TerminationReason;
use synthplan_search::route::SynthesisRoute;

/// Fails the test if the tree ever asks for an estimate.
struct Untouchable;

impl ValueEstimator for Untouchable {
    fn estimate(&self, _molecules: &[String]) -> Vec<f64> {
        panic!("estimator must not run for a terminal target")
    }
}

#[test]
fn terminal_target_reports_solved_with_zero_steps() {
    let set = terminals(&["Oc1ccccc1"]);
    let table = Table::new().with("Oc1ccccc1", &[("C.O", 1.0)]);
    let result = run("Oc1ccccc1", &set, &table, &table, &Untouchable, unfiltered(10));

    assert!(result.report.solved);
    assert_eq!(result.report.steps, 0);
    assert_eq!(result.report.termination, TerminationReason::Solved);
    assert_eq!(result.report.first_solution_step, None);
    assert_eq!(result.report.molecules.len(), 1);
    assert!(result.report.reactions.is_empty());
    assert!(result.violations.is_empty(), "{:?}", result.violations);
}

#[test]
fn terminal_target_route_has_no_steps() {
    let set = terminals(&["O=C=O"]);
    let table = Table::new();
    let result = run("O=C=O", &set, &table, &table, &ConstantEstimator(1.0), unfiltered(10));
    let route = SynthesisRoute::from_report(&result.report).expect("solved");
    assert!(route.steps.is_empty());
    assert!(route.starting_materials().is_empty());
    let json = result.report.to_json_value();
    assert_eq!(json["metadata"]["steps"], 0);
    assert_eq!(json["metadata"]["termination_reason"]["type"], "solved");
    assert_eq!(json["molecules"][0]["state"], "terminal");
    assert_eq!(json["molecules"][0]["rn_micros"], 0);
}
