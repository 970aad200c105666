//! Candidate filtering: lower bound, forward consistency check, renormalization.
//!
//! The filter is stateless. The molecules a forward check must not
//! self-match are carried in the [`ProposalRequest`] supplied by the caller.

use synthplan_kernel::molecule::canonical::EXCLUDED_OUTPUTS;
use synthplan_kernel::molecule::reactants::split_reactants;

use crate::contract::{probability_of, Proposal, ProposalRequest, ReactionProposer};
use crate::node::ScoredReaction;
use crate::policy::FilterPolicy;

/// How the forward consistency check affected a filter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyVerdict {
    /// Checking is turned off by policy.
    Disabled,
    /// Nothing survived the lower bound, so no check ran.
    NothingToCheck,
    /// The check ran and its survivors were kept.
    Applied,
    /// The check rejected everything at the search target; the
    /// pre-check candidates were reinstated.
    FellBackAtTarget,
}

impl ConsistencyVerdict {
    /// Stable lowercase tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::NothingToCheck => "nothing_to_check",
            Self::Applied => "applied",
            Self::FellBackAtTarget => "fell_back_at_target",
        }
    }
}

/// Counters for one filter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    /// Raw proposals offered.
    pub proposed: usize,
    /// Dropped as empty or placeholder outputs.
    pub placeholders: usize,
    /// Dropped for falling below the primary lower bound.
    pub below_lower_bound: usize,
    /// Dropped by the consistency check (0 when it fell back).
    pub failed_consistency: usize,
    /// Candidates returned.
    pub retained: usize,
    pub consistency: ConsistencyVerdict,
}

/// Filtered candidates plus statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub candidates: Vec<ScoredReaction>,
    pub stats: FilterStats,
}

/// Forward proposer broke its arity contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("forward proposer returned {actual} candidate sets for {expected} inputs")]
    ForwardArity { expected: usize, actual: usize },
}

/// Filter raw retro proposals for `molecule`.
///
/// 1. Split each proposal into reactants; drop placeholder outputs and any
///    proposal whose probability is below `policy.lower_bound` (NaN counts
///    as below).
/// 2. Without a consistency check (or with nothing left), return the
///    survivors.
/// 3. Otherwise ask `forward` for the products of each surviving reactant
///    set and keep a candidate only if the probability it assigns back to
///    `molecule` reaches `policy.check_lower_bound`; its score is multiplied
///    by that probability.
/// 4. If the check rejects everything and `is_target` is set, the step 1
///    survivors are used unchanged.
/// 5. Scores are renormalized to sum to 1 whenever the returned count
///    differs from the number of raw proposals.
///
/// # Errors
///
/// Returns [`FilterError::ForwardArity`] when `forward` returns the wrong
/// number of candidate sets.
pub fn filter_candidates(
    molecule: &str,
    is_target: bool,
    proposals: &[Proposal],
    policy: &FilterPolicy,
    forward: &dyn ReactionProposer,
    request: &ProposalRequest<'_>,
) -> Result<FilterOutcome, FilterError> {
    let mut stats = FilterStats {
        proposed: proposals.len(),
        placeholders: 0,
        below_lower_bound: 0,
        failed_consistency: 0,
        retained: 0,
        consistency: ConsistencyVerdict::Disabled,
    };

    let mut retained: Vec<(&str, ScoredReaction)> = Vec::with_capacity(proposals.len());
    for proposal in proposals {
        if EXCLUDED_OUTPUTS.contains(&proposal.smiles.as_str()) {
            stats.placeholders += 1;
            continue;
        }
        if proposal.probability.is_nan() || proposal.probability < policy.lower_bound {
            stats.below_lower_bound += 1;
            continue;
        }
        retained.push((
            proposal.smiles.as_str(),
            ScoredReaction {
                reactants: split_reactants(&proposal.smiles),
                score: proposal.probability,
            },
        ));
    }

    let mut candidates = if !policy.consistency_check || retained.is_empty() {
        if policy.consistency_check {
            stats.consistency = ConsistencyVerdict::NothingToCheck;
        }
        retained.into_iter().map(|(_, c)| c).collect()
    } else {
        let inputs: Vec<String> = retained.iter().map(|(s, _)| (*s).to_string()).collect();
        let products = forward.propose(&inputs, request);
        if products.len() != inputs.len() {
            return Err(FilterError::ForwardArity {
                expected: inputs.len(),
                actual: products.len(),
            });
        }

        let mut consistent = Vec::with_capacity(retained.len());
        for ((_, candidate), set) in retained.iter().zip(&products) {
            match probability_of(set, molecule) {
                Some(p) if p >= policy.check_lower_bound => consistent.push(ScoredReaction {
                    reactants: candidate.reactants.clone(),
                    score: candidate.score * p,
                }),
                _ => stats.failed_consistency += 1,
            }
        }

        if consistent.is_empty() && is_target {
            tracing::info!(
                molecule,
                checked = retained.len(),
                "no candidate passed the consistency check; using unchecked candidates"
            );
            stats.failed_consistency = 0;
            stats.consistency = ConsistencyVerdict::FellBackAtTarget;
            retained.into_iter().map(|(_, c)| c).collect()
        } else {
            stats.consistency = ConsistencyVerdict::Applied;
            consistent
        }
    };

    if candidates.len() != proposals.len() {
        renormalize(&mut candidates);
    }
    stats.retained = candidates.len();
    tracing::debug!(
        molecule,
        proposed = stats.proposed,
        retained = stats.retained,
        consistency = stats.consistency.as_str(),
        "filtered candidates"
    );
    Ok(FilterOutcome { candidates, stats })
}

fn renormalize(candidates: &mut [ScoredReaction]) {
    let total: f64 = candidates.iter().map(|c| c.score).sum();
    if total > 0.0 && total.is_finite() {
        for c in candidates {
            c.score /= total;
        }
    }
}
