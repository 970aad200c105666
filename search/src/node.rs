//! Arena node types for the AND-OR tree.
//!
//! Nodes never own each other. Parent and child links are arena indices
//! ([`MolId`], [`RxnId`]) resolved through [`crate::tree::SearchTree`], which
//! is the only place node fields are mutated.

use std::fmt;

/// Proposal probabilities are clamped to this floor before taking the log.
pub const PROBABILITY_FLOOR: f64 = 1e-3;

/// Reaction cost for a proposal probability: `-ln(clamp(p, floor, 1))`.
///
/// NaN maps to the floor, so every returned cost is finite and non-negative.
#[must_use]
pub fn probability_to_cost(probability: f64) -> f64 {
    let p = if probability.is_nan() {
        PROBABILITY_FLOOR
    } else {
        probability.clamp(PROBABILITY_FLOOR, 1.0)
    };
    0.0 - p.ln()
}

/// Index of a molecule (OR-node) in the tree arena. The root is always `MolId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MolId(pub usize);

/// Index of a reaction (AND-node) in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RxnId(pub usize);

impl MolId {
    /// The root molecule.
    pub const ROOT: Self = Self(0);
}

impl fmt::Display for MolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl fmt::Display for RxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Lifecycle of a molecule. Transitions only leave `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoleculeState {
    /// Unexpanded and eligible for selection.
    Open,
    /// Expanded with at least one reaction child.
    Expanded,
    /// Expansion produced no usable reaction; `rn` is permanently infinite.
    Dead,
    /// Purchasable; created solved and never opened.
    Terminal,
}

impl MoleculeState {
    /// Stable lowercase tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Expanded => "expanded",
            Self::Dead => "dead",
            Self::Terminal => "terminal",
        }
    }
}

/// OR-node: solved if any child reaction is solved.
#[derive(Debug, Clone)]
pub struct MoleculeNode {
    pub(crate) id: MolId,
    pub(crate) smiles: String,
    pub(crate) parent: Option<RxnId>,
    pub(crate) children: Vec<RxnId>,
    pub(crate) depth: usize,
    pub(crate) state: MoleculeState,
    pub(crate) has_found: bool,
    pub(crate) cost: f64,
    pub(crate) rn: f64,
    pub(crate) priority: f64,
}

impl MoleculeNode {
    pub(crate) fn new(
        id: MolId,
        smiles: String,
        parent: Option<RxnId>,
        depth: usize,
        cost: f64,
        terminal: bool,
    ) -> Self {
        let (state, rn) = if terminal {
            (MoleculeState::Terminal, 0.0)
        } else {
            (MoleculeState::Open, cost)
        };
        Self {
            id,
            smiles,
            parent,
            children: Vec::new(),
            depth,
            state,
            has_found: terminal,
            cost,
            rn,
            priority: f64::INFINITY,
        }
    }

    #[must_use]
    pub fn id(&self) -> MolId {
        self.id
    }

    /// Canonical SMILES.
    #[must_use]
    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    /// The reaction this molecule is a reactant of (`None` for the root).
    #[must_use]
    pub fn parent(&self) -> Option<RxnId> {
        self.parent
    }

    /// Child reactions in creation order.
    #[must_use]
    pub fn children(&self) -> &[RxnId] {
        &self.children
    }

    /// Number of reaction steps between this molecule and the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn state(&self) -> MoleculeState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == MoleculeState::Open
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state == MoleculeState::Terminal
    }

    /// Whether a fully solved subtree exists below this molecule.
    #[must_use]
    pub fn has_found(&self) -> bool {
        self.has_found
    }

    /// Value estimate at creation (0 for terminals).
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Current best-known cost to solve.
    #[must_use]
    pub fn rn(&self) -> f64 {
        self.rn
    }

    /// Selection key: estimated total route cost if expanded next.
    #[must_use]
    pub fn priority(&self) -> f64 {
        self.priority
    }
}

/// AND-node: solved only if every reactant is solved.
#[derive(Debug, Clone)]
pub struct ReactionNode {
    pub(crate) id: RxnId,
    pub(crate) parent: MolId,
    pub(crate) children: Vec<MolId>,
    pub(crate) probability: f64,
    pub(crate) cost: f64,
    pub(crate) accumulated_cost: f64,
    pub(crate) rn: f64,
    pub(crate) has_found: bool,
    pub(crate) is_open: bool,
}

impl ReactionNode {
    pub(crate) fn new(id: RxnId, parent: MolId, probability: f64) -> Self {
        let cost = probability_to_cost(probability);
        Self {
            id,
            parent,
            children: Vec::new(),
            probability,
            cost,
            accumulated_cost: cost,
            rn: 0.0,
            has_found: false,
            is_open: true,
        }
    }

    #[must_use]
    pub fn id(&self) -> RxnId {
        self.id
    }

    /// The molecule this reaction decomposes.
    #[must_use]
    pub fn parent(&self) -> MolId {
        self.parent
    }

    /// Reactant molecules in proposal order.
    #[must_use]
    pub fn children(&self) -> &[MolId] {
        &self.children
    }

    /// Filtered proposal score the reaction was created from.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// `-ln(clamp(probability))`.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Sum of reaction costs on the path from the root to this reaction.
    #[must_use]
    pub fn accumulated_cost(&self) -> f64 {
        self.accumulated_cost
    }

    /// Sum of the reactants' `rn`.
    #[must_use]
    pub fn rn(&self) -> f64 {
        self.rn
    }

    #[must_use]
    pub fn has_found(&self) -> bool {
        self.has_found
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }
}

/// A filtered candidate decomposition ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReaction {
    /// Reactant SMILES in proposal order.
    pub reactants: Vec<String>,
    /// Filtered, renormalized score in `[0, 1]`.
    pub score: f64,
}

impl ScoredReaction {
    #[must_use]
    pub fn new<S: Into<String>>(reactants: impl IntoIterator<Item = S>, score: f64) -> Self {
        Self {
            reactants: reactants.into_iter().map(Into::into).collect(),
            score,
        }
    }
}
