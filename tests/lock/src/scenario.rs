//! In-memory collaborators and search runners for lock tests.
//!
//! [`Table`] answers proposals verbatim (no canonicalization or
//! renormalization), so tests control the exact probabilities the filter
//! and tree see.

use std::collections::BTreeMap;
use std::path::PathBuf;

use synthplan_harness::fixture::ScenarioFixture;
use synthplan_kernel::molecule::canonical::SyntaxCanonicalizer;
use synthplan_kernel::molecule::terminal::TerminalSet;
use synthplan_search::contract::{CandidateSet, Proposal, ProposalRequest, ReactionProposer, ValueEstimator};
use synthplan_search::policy::{SearchPolicy, TreeConfig};
use synthplan_search::report::SearchReport;
use synthplan_search::search::{NullObserver, SearchDriver};
use synthplan_search::tree::SearchTree;

/// Proposal table keyed by input SMILES.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: BTreeMap<String, Vec<Proposal>>,
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the proposals returned for `input`.
    #[must_use]
    pub fn with(mut self, input: &str, proposals: &[(&str, f64)]) -> Self {
        self.rows.insert(
            input.to_string(),
            proposals.iter().map(|(s, p)| Proposal::new(*s, *p)).collect(),
        );
        self
    }
}

impl ReactionProposer for Table {
    fn propose(&self, molecules: &[String], _request: &ProposalRequest<'_>) -> Vec<CandidateSet> {
        molecules
            .iter()
            .map(|m| self.rows.get(m).cloned().unwrap_or_default())
            .collect()
    }
}

/// Terminal set from string literals.
#[must_use]
pub fn terminals(smiles: &[&str]) -> TerminalSet {
    smiles.iter().copied().collect()
}

/// Policy with filtering disabled and early stop on the first solution.
#[must_use]
pub fn unfiltered(max_steps: u64) -> SearchPolicy {
    SearchPolicy {
        max_steps,
        lower_bound: 0.0,
        consistency_check: false,
        ..SearchPolicy::default()
    }
}

/// Result of one search plus the tree's invariant check at the end.
pub struct Run {
    pub report: SearchReport,
    pub violations: Vec<String>,
    pub priorities_idempotent: bool,
}

/// Run one search to completion and check the final tree.
///
/// # Panics
///
/// Panics if the tree cannot be built or the policy is invalid.
#[must_use]
pub fn run(
    target: &str,
    terminal_set: &TerminalSet,
    retro: &dyn ReactionProposer,
    forward: &dyn ReactionProposer,
    estimator: &dyn ValueEstimator,
    policy: SearchPolicy,
) -> Run {
    let mut tree = SearchTree::new(target, "lock", terminal_set, TreeConfig::default(), estimator)
        .expect("tree builds");
    let driver = SearchDriver::new(retro, forward, estimator, policy);
    let report = driver.run(&mut tree, &mut NullObserver).expect("policy is valid");
    let violations = tree.verify().iter().map(ToString::to_string).collect();

    let before: Vec<u64> = tree.molecules().iter().map(|m| m.priority().to_bits()).collect();
    let ids: Vec<_> = tree.molecules().iter().map(|m| m.id()).collect();
    for id in ids {
        tree.refresh_priorities(id).expect("known molecule");
    }
    let after: Vec<u64> = tree.molecules().iter().map(|m| m.priority().to_bits()).collect();

    Run {
        report,
        violations,
        priorities_idempotent: before == after,
    }
}

/// Re-run the search with budgets `0, 1, 2, ...` and check the tree after
/// each one. Returns the number of steps of the longest run.
///
/// The driver is deterministic, so the run with budget `k` is the first `k`
/// steps of the full search.
///
/// # Panics
///
/// Panics with the step and violation list when any prefix is inconsistent.
pub fn verify_every_step(
    target: &str,
    terminal_set: &TerminalSet,
    retro: &dyn ReactionProposer,
    forward: &dyn ReactionProposer,
    estimator: &dyn ValueEstimator,
    policy: &SearchPolicy,
) -> u64 {
    let mut steps = 0;
    for budget in 0..=policy.max_steps {
        let result = run(
            target,
            terminal_set,
            retro,
            forward,
            estimator,
            SearchPolicy {
                max_steps: budget,
                ..policy.clone()
            },
        );
        assert!(
            result.violations.is_empty(),
            "invariant violations after {budget} step(s):\n{}",
            result.violations.join("\n")
        );
        assert!(
            result.priorities_idempotent,
            "priority refresh changed values after {budget} step(s)"
        );
        steps = result.report.steps;
        if steps < budget {
            break;
        }
    }
    steps
}

/// Path to the demo fixture shipped with the harness.
#[must_use]
pub fn demo_fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../harness/fixtures/demo.json")
}

/// Load the demo fixture.
///
/// # Panics
///
/// Panics if the fixture is missing or invalid.
#[must_use]
pub fn demo_fixture() -> ScenarioFixture {
    ScenarioFixture::load(&demo_fixture_path(), &SyntaxCanonicalizer).expect("demo fixture loads")
}
