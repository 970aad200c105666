//! Cooperative cancellation and collaborator faults end the search with a
//! report and leave the tree valid.

use std::sync::atomic::{AtomicUsize, Ordering};

use lock_tests::scenario::{terminals, unfiltered, Table};
use synthplan_search::contract::{CandidateSet, ConstantEstimator, Direction, ProposalRequest, ReactionProposer, ValueEstimator};
use synthplan_search::policy::TreeConfig;
use synthplan_search::report::{PanicStage, TerminationReason};
use synthplan_search::search::{CancelFlag, SearchDriver, SearchObserver, StepReport};
use synthplan_search::tree::SearchTree;

/// Raises the cancel flag from inside the step callback.
struct CancelAfter {
    flag: CancelFlag,
    after: u64,
}

impl SearchObserver for CancelAfter {
    fn on_step(&mut self, step: &StepReport<'_>) {
        if step.step + 1 >= self.after {
            self.flag.cancel();
        }
    }
}

/// Retro proposer that always offers one fresh non-terminal reactant.
struct Endless(AtomicUsize);

impl ReactionProposer for Endless {
    fn propose(&self, molecules: &[String], _request: &ProposalRequest<'_>) -> Vec<CandidateSet> {
        molecules
            .iter()
            .map(|_| {
                let n = self.0.fetch_add(1, Ordering::SeqCst);
                vec![synthplan_search::contract::Proposal::new(format!("C{n}"), 1.0)]
            })
            .collect()
    }
}

#[test]
fn cancel_between_steps_keeps_tree_valid() {
    let set = terminals(&[]);
    let est = ConstantEstimator(1.0);
    let retro = Endless(AtomicUsize::new(0));
    let mut tree = SearchTree::new("T", "cancel", &set, TreeConfig::default(), &est).unwrap();
    let flag = CancelFlag::new();
    let driver = SearchDriver::new(&retro, &retro, &est, unfiltered(100)).with_cancel(flag.clone());
    let mut observer = CancelAfter { flag, after: 3 };
    let report = driver.run(&mut tree, &mut observer).unwrap();

    assert_eq!(report.termination, TerminationReason::Cancelled);
    assert_eq!(report.steps, 3);
    assert!(!report.solved);
    assert!(tree.verify().is_empty(), "{:?}", tree.verify());
    assert_eq!(tree.open_count(), 1);
}

struct WrongArity;

impl ReactionProposer for WrongArity {
    fn propose(&self, _molecules: &[String], _request: &ProposalRequest<'_>) -> Vec<CandidateSet> {
        Vec::new()
    }
}

#[test]
fn retro_arity_violation_is_reported() {
    let set = terminals(&[]);
    let est = ConstantEstimator(1.0);
    let mut tree = SearchTree::new("T", "arity", &set, TreeConfig::default(), &est).unwrap();
    let driver = SearchDriver::new(&WrongArity, &WrongArity, &est, unfiltered(5));
    let report = driver
        .run(&mut tree, &mut synthplan_search::search::NullObserver)
        .unwrap();
    assert_eq!(
        report.termination,
        TerminationReason::ProposerContractViolation {
            direction: Direction::Retro,
            expected: 1,
            actual: 0,
        }
    );
    assert!(report.termination.is_fault());
    assert!(tree.root().is_open());
}

#[test]
fn forward_arity_violation_is_reported() {
    let set = terminals(&[]);
    let est = ConstantEstimator(1.0);
    let retro = Table::new().with("T", &[("A", 1.0)]);
    let mut tree = SearchTree::new("T", "arity", &set, TreeConfig::default(), &est).unwrap();
    let policy = synthplan_search::policy::SearchPolicy {
        consistency_check: true,
        ..unfiltered(5)
    };
    let driver = SearchDriver::new(&retro, &WrongArity, &est, policy);
    let report = driver
        .run(&mut tree, &mut synthplan_search::search::NullObserver)
        .unwrap();
    assert!(matches!(
        report.termination,
        TerminationReason::ProposerContractViolation {
            direction: Direction::Forward,
            ..
        }
    ));
    assert_eq!(report.steps, 0);
}

/// Answers the root estimate, then misbehaves.
struct FaultyEstimator {
    calls: AtomicUsize,
    panic: bool,
}

impl ValueEstimator for FaultyEstimator {
    fn estimate(&self, molecules: &[String]) -> Vec<f64> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return vec![1.0; molecules.len()];
        }
        assert!(!self.panic, "estimator exploded");
        vec![f64::NAN; molecules.len()]
    }
}

#[test]
fn estimator_panic_leaves_tree_untouched() {
    let set = terminals(&[]);
    let est = FaultyEstimator {
        calls: AtomicUsize::new(0),
        panic: true,
    };
    let retro = Table::new().with("T", &[("A.B", 1.0)]);
    let mut tree = SearchTree::new("T", "panic", &set, TreeConfig::default(), &est).unwrap();
    let driver = SearchDriver::new(&retro, &retro, &est, unfiltered(5));
    let report = driver
        .run(&mut tree, &mut synthplan_search::search::NullObserver)
        .unwrap();
    assert_eq!(
        report.termination,
        TerminationReason::InternalPanic {
            stage: PanicStage::ValueEstimate
        }
    );
    assert_eq!(tree.molecules().len(), 1);
    assert!(tree.root().is_open());
    assert!(tree.verify().is_empty());
}

#[test]
fn invalid_estimate_is_a_contract_violation() {
    let set = terminals(&[]);
    let est = FaultyEstimator {
        calls: AtomicUsize::new(0),
        panic: false,
    };
    let retro = Table::new().with("T", &[("A", 1.0)]);
    let mut tree = SearchTree::new("T", "nan", &set, TreeConfig::default(), &est).unwrap();
    let driver = SearchDriver::new(&retro, &retro, &est, unfiltered(5));
    let report = driver
        .run(&mut tree, &mut synthplan_search::search::NullObserver)
        .unwrap();
    assert!(matches!(
        report.termination,
        TerminationReason::EstimatorContractViolation { .. }
    ));
    assert_eq!(tree.molecules().len(), 1);
    assert!(tree.verify().is_empty());
}
