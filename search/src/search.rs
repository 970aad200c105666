//! Search driver: the select-propose-filter-expand loop.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::contract::{Direction, ProposalRequest, ReactionProposer, ValueEstimator};
use crate::error::{SearchError, TreeError};
use crate::filter::{filter_candidates, FilterError};
use crate::node::{MolId, ScoredReaction};
use crate::policy::SearchPolicy;
use crate::report::{ExpandEvent, PanicStage, SearchReport, TerminationReason};
use crate::tree::SearchTree;

/// Cooperative cancellation flag, checked once before every expansion.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The current step, if any, completes first.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the driver is about to expand.
#[derive(Debug, Clone, Copy)]
pub struct StepReport<'a> {
    /// Zero-based step index.
    pub step: u64,
    pub max_steps: u64,
    pub molecule: MolId,
    pub smiles: &'a str,
    pub priority: f64,
    /// Up to `top_k_report` filtered candidates, best proposal first.
    pub top_candidates: &'a [ScoredReaction],
}

/// Hooks invoked by [`SearchDriver::run`]. Every method defaults to a no-op.
pub trait SearchObserver {
    /// Called after filtering, before the tree is modified.
    fn on_step(&mut self, _step: &StepReport<'_>) {}

    /// Called once, when the root first becomes solved.
    ///
    /// `step` is `None` when the target itself is terminal.
    fn on_route_found(&mut self, _step: Option<u64>, _tree: &SearchTree<'_>) {}

    /// Called with the final report.
    fn on_finished(&mut self, _report: &SearchReport) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {}

/// Runs best-first AND-OR search over a [`SearchTree`].
///
/// The retro and forward proposers may be the same object.
pub struct SearchDriver<'c> {
    retro: &'c dyn ReactionProposer,
    forward: &'c dyn ReactionProposer,
    estimator: &'c dyn ValueEstimator,
    policy: SearchPolicy,
    cancel: Option<CancelFlag>,
}

impl<'c> SearchDriver<'c> {
    #[must_use]
    pub fn new(
        retro: &'c dyn ReactionProposer,
        forward: &'c dyn ReactionProposer,
        estimator: &'c dyn ValueEstimator,
        policy: SearchPolicy,
    ) -> Self {
        Self {
            retro,
            forward,
            estimator,
            policy,
            cancel: None,
        }
    }

    /// Attach a cancellation flag.
    #[must_use]
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[must_use]
    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    /// Run the search loop until a stopping condition holds.
    ///
    /// All runtime terminations (budget, exhaustion, cancellation, contract
    /// violations, caught panics) return `Ok(SearchReport)` with the audit
    /// trail preserved, and the tree stays valid for inspection.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] only for pre-flight policy
    /// validation failures; the tree is untouched in that case.
    #[allow(clippy::too_many_lines)]
    pub fn run(
        &self,
        tree: &mut SearchTree<'_>,
        observer: &mut dyn SearchObserver,
    ) -> Result<SearchReport, SearchError> {
        self.policy.validate()?;
        let policy = &self.policy;
        let filter_policy = policy.filter();
        let mut events: Vec<ExpandEvent> = Vec::new();
        let mut first_solution_step: Option<u64> = None;

        if tree.is_solved() {
            tracing::info!(molecule = tree.target(), "target is terminal; nothing to expand");
            observer.on_route_found(None, tree);
            return Ok(self.finish(tree, TerminationReason::Solved, events, None, observer));
        }

        let termination_reason;
        loop {
            let step = events.len() as u64;
            if step >= policy.max_steps {
                termination_reason = TerminationReason::StepBudgetExhausted;
                break;
            }
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                termination_reason = TerminationReason::Cancelled;
                break;
            }
            let Some(mol_id) = tree.select_next() else {
                tracing::info!(step, "no open molecules");
                termination_reason = TerminationReason::NoOpenNodes;
                break;
            };
            let Some(selected) = tree.molecule(mol_id).cloned() else {
                termination_reason = TerminationReason::TreeInvariantViolation {
                    detail: format!("selected molecule {mol_id} is not in the arena"),
                };
                break;
            };
            let smiles = selected.smiles().to_string();
            tracing::info!(
                step,
                molecule = %smiles,
                priority = selected.priority(),
                "expanding"
            );

            // Retro proposal (with panic protection)
            let exclude: BTreeSet<String> = BTreeSet::from([smiles.clone()]);
            let retro_request = ProposalRequest::retro(tree.config(), &exclude);
            let retro_output = catch_unwind(AssertUnwindSafe(|| {
                self.retro
                    .propose(std::slice::from_ref(&smiles), &retro_request)
            }));
            let Ok(mut proposal_sets) = retro_output else {
                termination_reason = TerminationReason::InternalPanic {
                    stage: PanicStage::ProposeRetro,
                };
                break;
            };
            if proposal_sets.len() != 1 {
                tracing::warn!(step, actual = proposal_sets.len(), "retro proposer arity violation");
                termination_reason = TerminationReason::ProposerContractViolation {
                    direction: Direction::Retro,
                    expected: 1,
                    actual: proposal_sets.len() as u64,
                };
                break;
            }
            let proposals = proposal_sets.swap_remove(0);

            // Filter + forward consistency check (with panic protection)
            let no_exclusions = BTreeSet::new();
            let forward_request = ProposalRequest::forward(tree.config(), &no_exclusions);
            let filter_output = catch_unwind(AssertUnwindSafe(|| {
                filter_candidates(
                    &smiles,
                    mol_id == MolId::ROOT,
                    &proposals,
                    &filter_policy,
                    self.forward,
                    &forward_request,
                )
            }));
            let filtered = match filter_output {
                Ok(Ok(filtered)) => filtered,
                Ok(Err(FilterError::ForwardArity { expected, actual })) => {
                    tracing::warn!(step, expected, actual, "forward proposer arity violation");
                    termination_reason = TerminationReason::ProposerContractViolation {
                        direction: Direction::Forward,
                        expected: expected as u64,
                        actual: actual as u64,
                    };
                    break;
                }
                Err(_) => {
                    termination_reason = TerminationReason::InternalPanic {
                        stage: PanicStage::ConsistencyCheck,
                    };
                    break;
                }
            };

            let top_k = policy.top_k_report.min(filtered.candidates.len());
            observer.on_step(&StepReport {
                step,
                max_steps: policy.max_steps,
                molecule: mol_id,
                smiles: &smiles,
                priority: selected.priority(),
                top_candidates: &filtered.candidates[..top_k],
            });

            // Tree update; value estimates run before any mutation.
            let expand_output = catch_unwind(AssertUnwindSafe(|| {
                tree.expand(mol_id, &filtered.candidates, self.estimator)
            }));
            let outcome = match expand_output {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err @ (TreeError::EstimatorArity { .. } | TreeError::InvalidEstimate { .. }))) => {
                    tracing::warn!(step, error = %err, "value estimator contract violation");
                    termination_reason = TerminationReason::EstimatorContractViolation {
                        detail: err.to_string(),
                    };
                    break;
                }
                Ok(Err(err)) => {
                    termination_reason = TerminationReason::TreeInvariantViolation {
                        detail: err.to_string(),
                    };
                    break;
                }
                Err(_) => {
                    termination_reason = TerminationReason::InternalPanic {
                        stage: PanicStage::ValueEstimate,
                    };
                    break;
                }
            };

            if outcome.closed {
                tracing::warn!(step, molecule = %smiles, "no usable candidate; molecule closed");
            }
            let solved = outcome.solved;
            events.push(ExpandEvent::new(
                step,
                &selected,
                filtered.stats,
                &filtered.candidates,
                outcome,
            ));

            if solved && first_solution_step.is_none() {
                first_solution_step = Some(step);
                tracing::info!(step, rn = tree.root().rn(), "route found");
                observer.on_route_found(Some(step), tree);
            }
            if policy.should_stop_early(tree.is_solved(), step + 1) {
                termination_reason = TerminationReason::Solved;
                break;
            }
        }

        // Running out of budget or open nodes after the root is solved still
        // finishes as solved.
        let termination_reason = match termination_reason {
            TerminationReason::StepBudgetExhausted | TerminationReason::NoOpenNodes
                if tree.is_solved() =>
            {
                TerminationReason::Solved
            }
            other => other,
        };
        Ok(self.finish(tree, termination_reason, events, first_solution_step, observer))
    }

    fn finish(
        &self,
        tree: &SearchTree<'_>,
        reason: TerminationReason,
        events: Vec<ExpandEvent>,
        first_solution_step: Option<u64>,
        observer: &mut dyn SearchObserver,
    ) -> SearchReport {
        if reason.is_fault() {
            tracing::warn!(molecule = tree.target(), reason = %reason, "search aborted");
        }
        let report = SearchReport::from_tree(tree, &self.policy, reason, events, first_solution_step);
        tracing::info!(
            molecule = %report.target,
            reason = %report.termination,
            steps = report.steps,
            solved = report.solved,
            molecules = report.molecules.len(),
            "search finished"
        );
        observer.on_finished(&report);
        report
    }
}
