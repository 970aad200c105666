//! Collaborator contracts consumed by the search core.
//!
//! # Contract
//!
//! - Both traits are batch calls: one output per input, order-preserving.
//!   The tree and driver check arity and surface violations as typed
//!   terminations, never as panics.
//! - Implementations must be deterministic for reproducible searches: the
//!   same inputs and request must yield the same outputs in the same order.
//! - Implementations may parallelize internally but must not retain
//!   references to the inputs after returning.

use std::collections::BTreeSet;

use crate::policy::TreeConfig;

/// Direction of a single-step reaction prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Product to reactant sets.
    Retro,
    /// Reactant set to products.
    Forward,
}

impl Direction {
    /// Stable lowercase tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Retro => "retro",
            Self::Forward => "forward",
        }
    }
}

/// Parameters for one batched proposal call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalRequest<'a> {
    /// Prediction direction.
    pub direction: Direction,
    /// Beam width (number of outputs requested per input).
    pub beam_width: usize,
    /// Maximum decode length.
    pub max_decode_steps: usize,
    /// Sampling temperature.
    pub temperature: f64,
    /// Outputs equal to any of these molecules must be dropped.
    pub exclude: &'a BTreeSet<String>,
}

impl<'a> ProposalRequest<'a> {
    /// A retro request sized by `config.expansion_width`.
    #[must_use]
    pub fn retro(config: &TreeConfig, exclude: &'a BTreeSet<String>) -> Self {
        Self {
            direction: Direction::Retro,
            beam_width: config.expansion_width,
            max_decode_steps: config.max_decode_steps,
            temperature: config.temperature,
            exclude,
        }
    }

    /// A forward request sized by `config.check_width`.
    #[must_use]
    pub fn forward(config: &TreeConfig, exclude: &'a BTreeSet<String>) -> Self {
        Self {
            direction: Direction::Forward,
            beam_width: config.check_width,
            max_decode_steps: config.max_decode_steps,
            temperature: config.temperature,
            exclude,
        }
    }
}

/// One proposed output with its probability.
///
/// For retro proposals `smiles` is a dot-joined reactant set; for forward
/// proposals it is a product.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Canonical output SMILES.
    pub smiles: String,
    /// Probability in `[0, 1]`.
    pub probability: f64,
}

impl Proposal {
    /// Construct a proposal.
    #[must_use]
    pub fn new(smiles: impl Into<String>, probability: f64) -> Self {
        Self {
            smiles: smiles.into(),
            probability,
        }
    }
}

/// Ranked proposals for one input molecule, unique by `smiles`.
pub type CandidateSet = Vec<Proposal>;

/// Look up the probability assigned to `smiles` in a candidate set.
#[must_use]
pub fn probability_of(set: &[Proposal], smiles: &str) -> Option<f64> {
    set.iter().find(|p| p.smiles == smiles).map(|p| p.probability)
}

/// Single-step reaction prediction.
///
/// Must return exactly `molecules.len()` candidate sets.
pub trait ReactionProposer: Send + Sync {
    /// Propose outputs for a batch of molecules (or reactant sets).
    fn propose(&self, molecules: &[String], request: &ProposalRequest<'_>) -> Vec<CandidateSet>;
}

/// Cost-to-solve estimation for unexpanded molecules.
///
/// Must return exactly `molecules.len()` finite, non-negative costs.
pub trait ValueEstimator: Send + Sync {
    /// Estimate costs for a batch of molecules.
    fn estimate(&self, molecules: &[String]) -> Vec<f64>;
}

/// Estimator returning the same cost for every molecule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantEstimator(pub f64);

impl Default for ConstantEstimator {
    fn default() -> Self {
        Self(1.0)
    }
}

impl ValueEstimator for ConstantEstimator {
    fn estimate(&self, molecules: &[String]) -> Vec<f64> {
        vec![self.0; molecules.len()]
    }
}
