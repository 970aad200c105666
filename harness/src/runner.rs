//! Planning runner: one search per target, alone or in a batch.
//!
//! Each target gets its own [`SearchTree`] arena. Batch runs spread targets
//! over a bounded number of scoped threads; the collaborators and terminal
//! set are shared read-only, so results do not depend on the thread count.
//!
//! ```text
//! canonicalize target → SearchTree::new (root estimate)
//!   → SearchDriver::run → SearchReport → SynthesisRoute → digest
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::{json, Value};
use synthplan_kernel::digest::canon::{to_micros, CanonError};
use synthplan_kernel::digest::hash::ContentHash;
use synthplan_kernel::molecule::canonical::Canonicalizer;
use synthplan_kernel::molecule::terminal::TerminalSet;
use synthplan_search::contract::{ReactionProposer, ValueEstimator};
use synthplan_search::error::{SearchError, TreeError};
use synthplan_search::report::{SearchReport, TerminationReason};
use synthplan_search::route::SynthesisRoute;
use synthplan_search::search::{CancelFlag, NullObserver, SearchDriver, SearchObserver};
use synthplan_search::tree::SearchTree;

use crate::config::PlannerConfig;
use crate::fixture::TargetSpec;

/// Error planning one target. Runtime terminations are not errors; they are
/// carried in the report.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("target {name:?} has invalid SMILES {smiles:?}")]
    InvalidTarget { name: String, smiles: String },
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("build tree: {0}")]
    Tree(#[from] TreeError),
    #[error("value estimator panicked while scoring target {name:?}")]
    EstimatorPanicked { name: String },
    #[error(transparent)]
    Canon(#[from] CanonError),
    #[error("batch worker panicked before finishing target #{index}")]
    WorkerPanicked { index: usize },
}

/// Borrowed collaborator bundle shared by every search in a run.
#[derive(Clone, Copy)]
pub struct Collaborators<'c> {
    pub retro: &'c dyn ReactionProposer,
    pub forward: &'c dyn ReactionProposer,
    pub estimator: &'c dyn ValueEstimator,
    pub canonicalizer: &'c dyn Canonicalizer,
}

/// Result of one completed search.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub report: SearchReport,
    /// Best route, when the target was solved.
    pub route: Option<SynthesisRoute>,
    pub report_digest: ContentHash,
}

impl PlanOutcome {
    #[must_use]
    pub fn summary(&self) -> TargetSummary {
        TargetSummary {
            name: self.report.name.clone(),
            target: self.report.target.clone(),
            solved: self.report.solved,
            steps: self.report.steps,
            first_solution_step: self.report.first_solution_step,
            termination: self.report.termination.clone(),
            route_steps: self.route.as_ref().map(|r| r.steps.len()),
            route_cost: self.route.as_ref().map(SynthesisRoute::total_cost),
            report_digest: self.report_digest.clone(),
        }
    }
}

/// Compact per-target result.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSummary {
    pub name: String,
    pub target: String,
    pub solved: bool,
    pub steps: u64,
    pub first_solution_step: Option<u64>,
    pub termination: TerminationReason,
    pub route_steps: Option<usize>,
    pub route_cost: Option<f64>,
    pub report_digest: ContentHash,
}

impl TargetSummary {
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        json!({
            "first_solution_step": self.first_solution_step,
            "name": self.name,
            "report_digest": self.report_digest.as_str(),
            "route_cost_micros": self.route_cost.and_then(to_micros),
            "route_steps": self.route_steps,
            "solved": self.solved,
            "steps": self.steps,
            "target": self.target,
            "termination": self.termination.as_str(),
        })
    }
}

/// Plan a single target.
///
/// # Errors
///
/// Returns [`PlanError`] when the target SMILES is invalid, the configuration
/// fails pre-flight validation, or the estimator fails on the target itself.
pub fn plan_target(
    target: &TargetSpec,
    terminals: &TerminalSet,
    config: &PlannerConfig,
    collaborators: Collaborators<'_>,
    cancel: Option<&CancelFlag>,
    observer: &mut dyn SearchObserver,
) -> Result<PlanOutcome, PlanError> {
    let canon = collaborators.canonicalizer.canonicalize(&target.smiles);
    if !canon.is_valid {
        return Err(PlanError::InvalidTarget {
            name: target.name.clone(),
            smiles: target.smiles.clone(),
        });
    }
    config.policy.validate()?;

    let built = catch_unwind(AssertUnwindSafe(|| {
        SearchTree::new(
            &canon.smiles,
            &target.name,
            terminals,
            config.tree.clone(),
            collaborators.estimator,
        )
    }));
    let mut tree = built.map_err(|_| PlanError::EstimatorPanicked {
        name: target.name.clone(),
    })??;

    let mut driver = SearchDriver::new(
        collaborators.retro,
        collaborators.forward,
        collaborators.estimator,
        config.policy.clone(),
    );
    if let Some(flag) = cancel {
        driver = driver.with_cancel(flag.clone());
    }
    let report = driver.run(&mut tree, observer)?;
    let route = SynthesisRoute::from_report(&report);
    let report_digest = report.digest()?;
    tracing::debug!(
        name = %target.name,
        digest = %report_digest,
        "planned target"
    );
    Ok(PlanOutcome {
        report,
        route,
        report_digest,
    })
}

/// Plan every target with up to `config.parallelism` worker threads.
///
/// Worker `w` handles targets `w, w + n, w + 2n, ...`. Results come back in
/// target order regardless of scheduling.
#[must_use]
pub fn plan_batch(
    targets: &[TargetSpec],
    terminals: &TerminalSet,
    config: &PlannerConfig,
    collaborators: Collaborators<'_>,
    cancel: Option<&CancelFlag>,
) -> Vec<Result<PlanOutcome, PlanError>> {
    let workers = config.parallelism.clamp(1, targets.len().max(1));
    tracing::info!(targets = targets.len(), workers, "planning batch");

    let mut slots: Vec<Option<Result<PlanOutcome, PlanError>>> =
        targets.iter().map(|_| None).collect();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|w| {
                scope.spawn(move || {
                    targets
                        .iter()
                        .enumerate()
                        .skip(w)
                        .step_by(workers)
                        .map(|(i, target)| {
                            let result = plan_target(
                                target,
                                terminals,
                                config,
                                collaborators,
                                cancel,
                                &mut NullObserver,
                            );
                            (i, result)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for (w, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(results) => {
                    for (i, result) in results {
                        slots[i] = Some(result);
                    }
                }
                Err(_) => tracing::error!(worker = w, "batch worker panicked"),
            }
        }
    });

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.unwrap_or(Err(PlanError::WorkerPanicked { index })))
        .collect()
}

/// One row of a [`BatchSummary`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEntry {
    Planned(TargetSummary),
    Failed { name: String, error: String },
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchSummary {
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    #[must_use]
    pub fn from_results(targets: &[TargetSpec], results: &[Result<PlanOutcome, PlanError>]) -> Self {
        let entries = targets
            .iter()
            .zip(results)
            .map(|(target, result)| match result {
                Ok(outcome) => BatchEntry::Planned(outcome.summary()),
                Err(err) => BatchEntry::Failed {
                    name: target.name.clone(),
                    error: err.to_string(),
                },
            })
            .collect();
        Self { entries }
    }

    fn planned(&self) -> impl Iterator<Item = &TargetSummary> {
        self.entries.iter().filter_map(|e| match e {
            BatchEntry::Planned(s) => Some(s),
            BatchEntry::Failed { .. } => None,
        })
    }

    #[must_use]
    pub fn solved_count(&self) -> usize {
        self.planned().filter(|s| s.solved).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, BatchEntry::Failed { .. }))
            .count()
    }

    /// Mean expansion steps over solved targets.
    #[must_use]
    pub fn mean_steps_solved(&self) -> Option<f64> {
        let steps: Vec<u64> = self.planned().filter(|s| s.solved).map(|s| s.steps).collect();
        if steps.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = steps.iter().sum::<u64>() as f64 / steps.len() as f64;
        Some(mean)
    }

    #[must_use]
    pub fn to_json_value(&self) -> Value {
        let entries: Vec<Value> = self
            .entries
            .iter()
            .map(|e| match e {
                BatchEntry::Planned(s) => s.to_json_value(),
                BatchEntry::Failed { name, error } => json!({"error": error, "name": name}),
            })
            .collect();
        json!({
            "entries": entries,
            "failed": self.failed_count(),
            "mean_steps_solved_micros": self.mean_steps_solved().and_then(to_micros),
            "solved": self.solved_count(),
            "targets": self.entries.len(),
        })
    }
}
