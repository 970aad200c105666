//! Typed search errors.
//!
//! `SearchError` represents pre-flight failures only. Runtime terminations
//! (exhaustion, cancellation, collaborator contract violations, caught panics)
//! are expressed via [`crate::report::TerminationReason`] and always produce a
//! [`crate::report::SearchReport`].
//!
//! `TreeError` is returned by tree operations whose preconditions the caller
//! can violate (unknown ids, expanding a closed node) and by estimator
//! contract checks during construction and expansion.

use crate::node::{MolId, RxnId};

/// Typed failure for pre-flight validation of configuration and policy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// A tree configuration field is out of range.
    #[error("invalid tree config: {detail}")]
    InvalidTreeConfig { detail: String },
    /// A search policy field is out of range.
    #[error("invalid search policy: {detail}")]
    InvalidPolicy { detail: String },
}

/// Failure of a tree operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// The tree configuration failed validation.
    #[error(transparent)]
    Config(#[from] SearchError),
    /// No molecule with this id exists in the arena.
    #[error("unknown molecule id {0:?}")]
    UnknownMolecule(MolId),
    /// No reaction with this id exists in the arena.
    #[error("unknown reaction id {0:?}")]
    UnknownReaction(RxnId),
    /// The molecule has already been expanded, closed, or is terminal.
    #[error("molecule {0:?} is not open")]
    MoleculeNotOpen(MolId),
    /// The reaction has already been finalized.
    #[error("reaction {0:?} is not open")]
    ReactionNotOpen(RxnId),
    /// The value estimator returned the wrong number of estimates.
    #[error("value estimator returned {actual} estimates for {expected} molecules")]
    EstimatorArity { expected: usize, actual: usize },
    /// The value estimator returned a NaN, infinite, or negative cost.
    #[error("value estimator returned invalid cost {value} for {smiles}")]
    InvalidEstimate { smiles: String, value: f64 },
}
