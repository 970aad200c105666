//! `SearchReport`: the audit artifact of one search.
//!
//! The normative decision surface is the ordered list of [`ExpandEvent`]
//! entries. The molecule and reaction summaries are a snapshot of the final
//! tree for visualization and route reconstruction.
//!
//! Costs and probabilities are written to canonical JSON as fixed-point
//! micro-units; infinite costs are written as `null`.

use serde_json::{json, Value};
use synthplan_kernel::digest::canon::{canonical_json_bytes, to_micros, CanonError};
use synthplan_kernel::digest::hash::{canonical_hash, ContentHash, HashDomain};
use synthplan_kernel::molecule::reactants::join_reactants;

use crate::contract::Direction;
use crate::filter::FilterStats;
use crate::node::{MolId, MoleculeNode, MoleculeState, ReactionNode, RxnId, ScoredReaction};
use crate::policy::{SearchPolicy, TreeConfig};
use crate::tree::{CandidateOutcome, ExpandOutcome, SearchTree};

/// Why the search loop stopped.
///
/// `Solved` is reported whenever the root is solved when the loop ends
/// through the stopping policy, budget or exhaustion. `Cancelled` and the
/// fault variants take precedence; the report's `solved` flag still records
/// whether a route exists in those cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The root is solved.
    Solved,
    /// No open molecule with finite priority remains.
    NoOpenNodes,
    /// The cancel flag was raised.
    Cancelled,
    /// `max_steps` expansions were performed.
    StepBudgetExhausted,
    /// A proposer returned the wrong number of candidate sets.
    ProposerContractViolation {
        direction: Direction,
        expected: u64,
        actual: u64,
    },
    /// The value estimator returned the wrong arity or an invalid cost.
    EstimatorContractViolation { detail: String },
    /// The tree rejected an operation the driver issued.
    TreeInvariantViolation { detail: String },
    /// A panic was caught in a collaborator callback.
    InternalPanic { stage: PanicStage },
}

impl TerminationReason {
    /// Stable lowercase tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solved => "solved",
            Self::NoOpenNodes => "no_open_nodes",
            Self::Cancelled => "cancelled",
            Self::StepBudgetExhausted => "step_budget_exhausted",
            Self::ProposerContractViolation { .. } => "proposer_contract_violation",
            Self::EstimatorContractViolation { .. } => "estimator_contract_violation",
            Self::TreeInvariantViolation { .. } => "tree_invariant_violation",
            Self::InternalPanic { .. } => "internal_panic",
        }
    }

    /// Whether the search ended because a collaborator misbehaved.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Self::ProposerContractViolation { .. }
                | Self::EstimatorContractViolation { .. }
                | Self::TreeInvariantViolation { .. }
                | Self::InternalPanic { .. }
        )
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage at which a panic was caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicStage {
    /// `ReactionProposer::propose()` panicked on the retro call.
    ProposeRetro,
    /// The forward proposer panicked during the consistency check.
    ConsistencyCheck,
    /// `ValueEstimator::estimate()` panicked during expansion.
    ValueEstimate,
}

impl PanicStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProposeRetro => "propose_retro",
            Self::ConsistencyCheck => "consistency_check",
            Self::ValueEstimate => "value_estimate",
        }
    }
}

/// A filtered candidate with its expansion outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// Dot-joined reactant set.
    pub reactants: String,
    /// Filtered score offered to the tree.
    pub score: f64,
    pub outcome: CandidateOutcome,
}

/// One select-propose-filter-expand step.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandEvent {
    /// Zero-based step index.
    pub step: u64,
    pub molecule: MolId,
    pub smiles: String,
    /// Priority at selection time.
    pub priority: f64,
    pub filter: FilterStats,
    pub candidates: Vec<CandidateRecord>,
    /// The molecule was closed as dead.
    pub closed: bool,
    /// The root was solved after this step.
    pub solved: bool,
}

impl ExpandEvent {
    pub(crate) fn new(
        step: u64,
        molecule: &MoleculeNode,
        filter: FilterStats,
        offered: &[ScoredReaction],
        outcome: ExpandOutcome,
    ) -> Self {
        let candidates = offered
            .iter()
            .zip(outcome.candidates)
            .map(|(c, outcome)| CandidateRecord {
                reactants: join_reactants(&c.reactants),
                score: c.score,
                outcome,
            })
            .collect();
        Self {
            step,
            molecule: molecule.id(),
            smiles: molecule.smiles().to_string(),
            priority: molecule.priority(),
            filter,
            candidates,
            closed: outcome.closed,
            solved: outcome.solved,
        }
    }
}

/// Final-state snapshot of a molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeSummary {
    pub id: MolId,
    pub smiles: String,
    pub parent: Option<RxnId>,
    pub children: Vec<RxnId>,
    pub depth: usize,
    pub state: MoleculeState,
    pub has_found: bool,
    pub cost: f64,
    pub rn: f64,
    pub priority: f64,
}

impl From<&MoleculeNode> for MoleculeSummary {
    fn from(m: &MoleculeNode) -> Self {
        Self {
            id: m.id(),
            smiles: m.smiles().to_string(),
            parent: m.parent(),
            children: m.children().to_vec(),
            depth: m.depth(),
            state: m.state(),
            has_found: m.has_found(),
            cost: m.cost(),
            rn: m.rn(),
            priority: m.priority(),
        }
    }
}

/// Final-state snapshot of a reaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionSummary {
    pub id: RxnId,
    pub parent: MolId,
    pub children: Vec<MolId>,
    pub probability: f64,
    pub cost: f64,
    pub accumulated_cost: f64,
    pub rn: f64,
    pub has_found: bool,
}

impl From<&ReactionNode> for ReactionSummary {
    fn from(r: &ReactionNode) -> Self {
        Self {
            id: r.id(),
            parent: r.parent(),
            children: r.children().to_vec(),
            probability: r.probability(),
            cost: r.cost(),
            accumulated_cost: r.accumulated_cost(),
            rn: r.rn(),
            has_found: r.has_found(),
        }
    }
}

/// The complete search audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub target: String,
    pub name: String,
    pub termination: TerminationReason,
    /// Whether the root is solved.
    pub solved: bool,
    /// Expansion steps performed.
    pub steps: u64,
    /// Step after which the root first became solved (`None` if never, or
    /// if the target was terminal).
    pub first_solution_step: Option<u64>,
    pub events: Vec<ExpandEvent>,
    pub molecules: Vec<MoleculeSummary>,
    pub reactions: Vec<ReactionSummary>,
    pub tree_config: TreeConfig,
    pub policy: SearchPolicy,
}

impl SearchReport {
    pub(crate) fn from_tree(
        tree: &SearchTree<'_>,
        policy: &SearchPolicy,
        termination: TerminationReason,
        events: Vec<ExpandEvent>,
        first_solution_step: Option<u64>,
    ) -> Self {
        Self {
            target: tree.target().to_string(),
            name: tree.name().to_string(),
            termination,
            solved: tree.is_solved(),
            steps: events.len() as u64,
            first_solution_step,
            events,
            molecules: tree.molecules().iter().map(MoleculeSummary::from).collect(),
            reactions: tree.reactions().iter().map(ReactionSummary::from).collect(),
            tree_config: tree.config().clone(),
            policy: policy.clone(),
        }
    }

    /// Root molecule summary.
    #[must_use]
    pub fn root(&self) -> Option<&MoleculeSummary> {
        self.molecules.first()
    }

    /// Total candidates offered to the tree across all steps.
    #[must_use]
    pub fn total_candidates(&self) -> usize {
        self.events.iter().map(|e| e.candidates.len()).sum()
    }

    /// Molecules closed as dead.
    #[must_use]
    pub fn total_closed(&self) -> usize {
        self.events.iter().filter(|e| e.closed).count()
    }

    /// Serialize to canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, CanonError> {
        canonical_json_bytes(&self.to_json_value())
    }

    /// Content hash of the canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = self.to_canonical_json_bytes()?;
        Ok(canonical_hash(HashDomain::SearchReport, &bytes))
    }

    /// Convert to a `serde_json::Value` for canonical serialization.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        json!({
            "events": self.events.iter().map(event_to_json).collect::<Vec<_>>(),
            "metadata": {
                "first_solution_step": self.first_solution_step,
                "name": self.name,
                "policy": self.policy.to_json_value(),
                "policy_digest": digest_or_null(self.policy.digest()),
                "solved": self.solved,
                "steps": self.steps,
                "target": self.target,
                "termination_reason": termination_reason_to_json(&self.termination),
                "total_candidates": self.total_candidates(),
                "total_closed": self.total_closed(),
                "tree_config": self.tree_config.to_json_value(),
                "tree_config_digest": digest_or_null(self.tree_config.digest()),
            },
            "molecules": self.molecules.iter().map(molecule_to_json).collect::<Vec<_>>(),
            "reactions": self.reactions.iter().map(reaction_to_json).collect::<Vec<_>>(),
        })
    }
}

fn digest_or_null(digest: Result<ContentHash, CanonError>) -> Value {
    digest.map_or(Value::Null, |d| Value::String(d.to_string()))
}

fn event_to_json(e: &ExpandEvent) -> Value {
    json!({
        "candidates": e.candidates.iter().map(candidate_to_json).collect::<Vec<_>>(),
        "closed": e.closed,
        "filter": {
            "below_lower_bound": e.filter.below_lower_bound,
            "consistency": e.filter.consistency.as_str(),
            "failed_consistency": e.filter.failed_consistency,
            "placeholders": e.filter.placeholders,
            "proposed": e.filter.proposed,
            "retained": e.filter.retained,
        },
        "molecule": e.molecule.0,
        "priority_micros": to_micros(e.priority),
        "smiles": e.smiles,
        "solved": e.solved,
        "step": e.step,
    })
}

fn candidate_to_json(c: &CandidateRecord) -> Value {
    json!({
        "outcome": outcome_to_json(&c.outcome),
        "reactants": c.reactants,
        "score_micros": to_micros(c.score),
    })
}

fn outcome_to_json(o: &CandidateOutcome) -> Value {
    match o {
        CandidateOutcome::Accepted { reaction } => {
            json!({"reaction": reaction.0, "type": "accepted"})
        }
        CandidateOutcome::RejectedCycle { molecule } => {
            json!({"molecule": molecule, "type": "rejected_cycle"})
        }
        CandidateOutcome::RejectedEmpty => json!({"type": "rejected_empty"}),
    }
}

fn molecule_to_json(m: &MoleculeSummary) -> Value {
    json!({
        "children": m.children.iter().map(|r| r.0).collect::<Vec<_>>(),
        "cost_micros": to_micros(m.cost),
        "depth": m.depth,
        "has_found": m.has_found,
        "id": m.id.0,
        "parent": m.parent.map(|r| r.0),
        "priority_micros": to_micros(m.priority),
        "rn_micros": to_micros(m.rn),
        "smiles": m.smiles,
        "state": m.state.as_str(),
    })
}

fn reaction_to_json(r: &ReactionSummary) -> Value {
    json!({
        "accumulated_cost_micros": to_micros(r.accumulated_cost),
        "children": r.children.iter().map(|m| m.0).collect::<Vec<_>>(),
        "cost_micros": to_micros(r.cost),
        "has_found": r.has_found,
        "id": r.id.0,
        "parent": r.parent.0,
        "probability_micros": to_micros(r.probability),
        "rn_micros": to_micros(r.rn),
    })
}

fn termination_reason_to_json(r: &TerminationReason) -> Value {
    match r {
        TerminationReason::ProposerContractViolation {
            direction,
            expected,
            actual,
        } => json!({
            "actual": actual,
            "direction": direction.as_str(),
            "expected": expected,
            "type": r.as_str(),
        }),
        TerminationReason::EstimatorContractViolation { detail }
        | TerminationReason::TreeInvariantViolation { detail } => {
            json!({"detail": detail, "type": r.as_str()})
        }
        TerminationReason::InternalPanic { stage } => {
            json!({"stage": stage.as_str(), "type": r.as_str()})
        }
        TerminationReason::Solved
        | TerminationReason::NoOpenNodes
        | TerminationReason::Cancelled
        | TerminationReason::StepBudgetExhausted => json!({"type": r.as_str()}),
    }
}
