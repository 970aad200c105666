//! AND-OR search tree with retro-star cost propagation.
//!
//! # Ownership
//!
//! [`SearchTree`] is the arena: it exclusively owns every [`MoleculeNode`]
//! and [`ReactionNode`]. Cross references are [`MolId`] / [`RxnId`] indices.
//! The terminal set is borrowed read-only for the tree's lifetime.
//!
//! # Propagation
//!
//! - Bottom-up (`rn`, `has_found`): after a molecule is expanded or closed,
//!   an iterative walk re-sums each parent reaction and re-scans each parent
//!   molecule's minimum until nothing changes or the root is reached.
//!   Reactions re-sum rather than apply a delta so an infinite child never
//!   produces `inf - inf`.
//! - Top-down (`priority`): a molecule's priority is its parent reaction's
//!   accumulated cost plus the summed `rn` of the reactants of every
//!   reaction between it and the root; the root's priority is its own `rn`.
//!   Only reactions on the changed path see a new child `rn`, so after a
//!   structural change the subtree under the first-level reaction on that
//!   path is recomputed (the whole tree when the root itself changed), plus
//!   the root.
//!
//! # Failure safety
//!
//! [`SearchTree::expand`] queries the value estimator for every new reactant
//! before touching the arena, so an estimator error or panic leaves the tree
//! exactly as it was.

use std::collections::HashSet;

use synthplan_kernel::molecule::terminal::TerminalSet;

use crate::contract::ValueEstimator;
use crate::error::TreeError;
use crate::node::{MolId, MoleculeNode, MoleculeState, ReactionNode, RxnId, ScoredReaction};
use crate::policy::TreeConfig;

/// Relative tolerance for invariant checks over summed costs.
const COST_TOLERANCE: f64 = 1e-9;

/// Outcome of offering one candidate reaction to [`SearchTree::expand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// Inserted as a new reaction node.
    Accepted { reaction: RxnId },
    /// A reactant is the expanding molecule or one of its ancestors.
    RejectedCycle { molecule: String },
    /// The candidate had no reactants.
    RejectedEmpty,
}

/// Result of one expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOutcome {
    /// One entry per offered candidate, in input order.
    pub candidates: Vec<CandidateOutcome>,
    /// Number of reactions inserted.
    pub reactions_added: usize,
    /// Whether the molecule was closed as dead.
    pub closed: bool,
    /// Whether the root is solved after this expansion.
    pub solved: bool,
}

/// A violated tree invariant, reported by [`SearchTree::verify`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{molecule}: rn {actual} does not match expected {expected}")]
    MoleculeRn {
        molecule: MolId,
        expected: f64,
        actual: f64,
    },
    #[error("{reaction}: rn {actual} is not the sum of its reactants ({expected})")]
    ReactionRn {
        reaction: RxnId,
        expected: f64,
        actual: f64,
    },
    #[error("{molecule}: has_found disagrees with its children")]
    MoleculeHasFound { molecule: MolId },
    #[error("{reaction}: has_found is not the AND of its reactants")]
    ReactionHasFound { reaction: RxnId },
    #[error("{molecule}: terminal molecule is open or has children")]
    TerminalShape { molecule: MolId },
    #[error("{reaction}: reactant {molecule} repeats an ancestor")]
    SelfAncestor { reaction: RxnId, molecule: MolId },
    #[error("{reaction}: accumulated cost {actual} does not match path cost {expected}")]
    AccumulatedCost {
        reaction: RxnId,
        expected: f64,
        actual: f64,
    },
    #[error("{molecule}: priority {actual} does not match expected {expected}")]
    Priority {
        molecule: MolId,
        expected: f64,
        actual: f64,
    },
    #[error("{reaction}: reaction left open")]
    ReactionOpen { reaction: RxnId },
}

/// AND-OR tree for one target molecule.
#[derive(Debug, Clone)]
pub struct SearchTree<'t> {
    target: String,
    name: String,
    terminals: &'t TerminalSet,
    config: TreeConfig,
    molecules: Vec<MoleculeNode>,
    reactions: Vec<ReactionNode>,
}

impl<'t> SearchTree<'t> {
    /// Build a tree rooted at `target`.
    ///
    /// A terminal target yields a tree that is already solved; the estimator
    /// is not consulted in that case.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Config`] if `config` fails validation, or an
    /// estimator contract error for the root estimate.
    pub fn new(
        target: impl Into<String>,
        name: impl Into<String>,
        terminals: &'t TerminalSet,
        config: TreeConfig,
        estimator: &dyn ValueEstimator,
    ) -> Result<Self, TreeError> {
        config.validate()?;
        let target = target.into();
        let terminal = terminals.contains(&target);
        let cost = if terminal {
            0.0
        } else {
            estimate_costs(estimator, std::slice::from_ref(&target))?[0]
        };
        let root = MoleculeNode::new(MolId::ROOT, target.clone(), None, 0, cost, terminal);
        let mut tree = Self {
            target,
            name: name.into(),
            terminals,
            config,
            molecules: vec![root],
            reactions: Vec::new(),
        };
        tree.molecules[0].priority = tree.priority_formula(MolId::ROOT);
        Ok(tree)
    }

    /// Target SMILES.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The borrowed terminal set.
    #[must_use]
    pub fn terminals(&self) -> &'t TerminalSet {
        self.terminals
    }

    #[must_use]
    pub fn root(&self) -> &MoleculeNode {
        &self.molecules[0]
    }

    /// All molecules in creation order.
    #[must_use]
    pub fn molecules(&self) -> &[MoleculeNode] {
        &self.molecules
    }

    /// All reactions in creation order.
    #[must_use]
    pub fn reactions(&self) -> &[ReactionNode] {
        &self.reactions
    }

    #[must_use]
    pub fn molecule(&self, id: MolId) -> Option<&MoleculeNode> {
        self.molecules.get(id.0)
    }

    #[must_use]
    pub fn reaction(&self, id: RxnId) -> Option<&ReactionNode> {
        self.reactions.get(id.0)
    }

    /// Whether the root has a fully solved subtree.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.molecules[0].has_found
    }

    /// Number of molecules still eligible for expansion.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.molecules.iter().filter(|m| m.is_open()).count()
    }

    /// The open molecule with the lowest finite priority.
    ///
    /// Linear scan in creation order; the first minimum wins. Molecules with
    /// infinite priority are never selected.
    #[must_use]
    pub fn select_next(&self) -> Option<MolId> {
        let mut best: Option<MolId> = None;
        let mut best_priority = f64::INFINITY;
        for m in &self.molecules {
            if m.is_open() && m.priority < best_priority {
                best_priority = m.priority;
                best = Some(m.id);
            }
        }
        best
    }

    /// `id` followed by every molecule above it, ending at the root.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownMolecule`] for an id outside the arena.
    pub fn ancestors(&self, id: MolId) -> Result<Vec<MolId>, TreeError> {
        self.check_molecule(id)?;
        let mut out = vec![id];
        let mut current = id;
        while let Some(rxn) = self.molecules[current.0].parent {
            current = self.reactions[rxn.0].parent;
            out.push(current);
        }
        Ok(out)
    }

    /// Expand an open molecule with filtered candidate reactions.
    ///
    /// Candidates containing an ancestor (or the molecule itself) are
    /// rejected individually. If no candidate is accepted the molecule is
    /// closed as dead. Priorities are refreshed in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownMolecule`] or [`TreeError::MoleculeNotOpen`]
    /// for a bad target, or an estimator contract error. The tree is not
    /// modified when an error is returned.
    pub fn expand(
        &mut self,
        id: MolId,
        candidates: &[ScoredReaction],
        estimator: &dyn ValueEstimator,
    ) -> Result<ExpandOutcome, TreeError> {
        self.check_molecule(id)?;
        if !self.molecules[id.0].is_open() {
            return Err(TreeError::MoleculeNotOpen(id));
        }

        let ancestors: HashSet<&str> = self
            .ancestors(id)?
            .into_iter()
            .map(|m| self.molecules[m.0].smiles.as_str())
            .collect();

        // Plan: classify candidates and collect reactants needing an estimate.
        let mut verdicts: Vec<Option<CandidateOutcome>> = Vec::with_capacity(candidates.len());
        let mut to_estimate: Vec<String> = Vec::new();
        for candidate in candidates {
            if candidate.reactants.is_empty() {
                verdicts.push(Some(CandidateOutcome::RejectedEmpty));
                continue;
            }
            if let Some(cyclic) = candidate
                .reactants
                .iter()
                .find(|r| ancestors.contains(r.as_str()))
            {
                verdicts.push(Some(CandidateOutcome::RejectedCycle {
                    molecule: cyclic.clone(),
                }));
                continue;
            }
            verdicts.push(None);
            to_estimate.extend(
                candidate
                    .reactants
                    .iter()
                    .filter(|r| !self.terminals.contains(r))
                    .cloned(),
            );
        }
        let estimates = if to_estimate.is_empty() {
            Vec::new()
        } else {
            estimate_costs(estimator, &to_estimate)?
        };

        // Commit.
        let accepted = verdicts.iter().filter(|v| v.is_none()).count();
        if accepted == 0 {
            self.close(id);
            self.refresh_priorities(id)?;
            tracing::debug!(molecule = %id, offered = candidates.len(), "closed: no usable candidate");
            return Ok(ExpandOutcome {
                candidates: verdicts.into_iter().flatten().collect(),
                reactions_added: 0,
                closed: true,
                solved: self.is_solved(),
            });
        }

        let child_depth = self.molecules[id.0].depth + 1;
        let mut estimates = estimates.into_iter();
        let mut outcomes = Vec::with_capacity(candidates.len());
        for (candidate, verdict) in candidates.iter().zip(verdicts) {
            if let Some(rejected) = verdict {
                outcomes.push(rejected);
                continue;
            }
            let rxn = RxnId(self.reactions.len());
            self.reactions.push(ReactionNode::new(rxn, id, candidate.score));
            self.molecules[id.0].children.push(rxn);
            for reactant in &candidate.reactants {
                let terminal = self.terminals.contains(reactant);
                let cost = if terminal {
                    0.0
                } else {
                    estimates.next().unwrap_or(0.0)
                };
                let mol = MolId(self.molecules.len());
                self.molecules.push(MoleculeNode::new(
                    mol,
                    reactant.clone(),
                    Some(rxn),
                    child_depth,
                    cost,
                    terminal,
                ));
                self.reactions[rxn.0].children.push(mol);
            }
            self.init_reaction(rxn);
            outcomes.push(CandidateOutcome::Accepted { reaction: rxn });
        }

        self.init_molecule(id);
        self.refresh_priorities(id)?;
        tracing::debug!(
            molecule = %id,
            reactions = accepted,
            rn = self.molecules[id.0].rn,
            "expanded"
        );
        Ok(ExpandOutcome {
            candidates: outcomes,
            reactions_added: accepted,
            closed: false,
            solved: self.is_solved(),
        })
    }

    /// Recompute priorities below the first-level reaction on the path from
    /// `id` to the root, plus the root itself.
    ///
    /// Running this twice without an intervening structural change leaves
    /// every priority unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownMolecule`] for an id outside the arena.
    pub fn refresh_priorities(&mut self, id: MolId) -> Result<(), TreeError> {
        let path = self.ancestors(id)?;
        self.molecules[0].priority = self.priority_formula(MolId::ROOT);

        // `path` ends at the root; the molecule before it sits under the
        // first-level reaction.
        let mut stack: Vec<MolId> = match path.len() {
            1 => self.child_molecules(MolId::ROOT),
            n => {
                let first_level = path[n - 2];
                match self.molecules[first_level.0].parent {
                    Some(rxn) => self.reactions[rxn.0].children.clone(),
                    None => Vec::new(),
                }
            }
        };

        while let Some(mol) = stack.pop() {
            self.molecules[mol.0].priority = self.priority_formula(mol);
            stack.extend(self.child_molecules(mol));
        }
        Ok(())
    }

    /// Check every structural and cost invariant over the whole tree.
    ///
    /// Returns an empty vector for a consistent tree.
    #[must_use]
    pub fn verify(&self) -> Vec<InvariantViolation> {
        let mut out = Vec::new();

        for m in &self.molecules {
            let expected_rn = match m.state {
                MoleculeState::Open => m.cost,
                MoleculeState::Terminal => 0.0,
                MoleculeState::Dead => f64::INFINITY,
                MoleculeState::Expanded => self.min_child_rn(m),
            };
            if !costs_match(expected_rn, m.rn) {
                out.push(InvariantViolation::MoleculeRn {
                    molecule: m.id,
                    expected: expected_rn,
                    actual: m.rn,
                });
            }
            let expected_found =
                m.is_terminal() || m.children.iter().any(|r| self.reactions[r.0].has_found);
            if expected_found != m.has_found {
                out.push(InvariantViolation::MoleculeHasFound { molecule: m.id });
            }
            if m.is_terminal() && !m.children.is_empty() {
                out.push(InvariantViolation::TerminalShape { molecule: m.id });
            }
            let expected_priority = self.priority_formula(m.id);
            if !costs_match(expected_priority, m.priority) {
                out.push(InvariantViolation::Priority {
                    molecule: m.id,
                    expected: expected_priority,
                    actual: m.priority,
                });
            }
        }

        for r in &self.reactions {
            if r.is_open {
                out.push(InvariantViolation::ReactionOpen { reaction: r.id });
            }
            let expected_rn = self.sum_child_rn(r);
            if !costs_match(expected_rn, r.rn) {
                out.push(InvariantViolation::ReactionRn {
                    reaction: r.id,
                    expected: expected_rn,
                    actual: r.rn,
                });
            }
            let expected_found = r.children.iter().all(|m| self.molecules[m.0].has_found);
            if expected_found != r.has_found {
                out.push(InvariantViolation::ReactionHasFound { reaction: r.id });
            }
            let expected_acc = r.cost + self.grandparent_accumulated(r);
            if !costs_match(expected_acc, r.accumulated_cost) {
                out.push(InvariantViolation::AccumulatedCost {
                    reaction: r.id,
                    expected: expected_acc,
                    actual: r.accumulated_cost,
                });
            }
            if let Ok(path) = self.ancestors(r.parent) {
                let above: HashSet<&str> = path
                    .iter()
                    .map(|a| self.molecules[a.0].smiles.as_str())
                    .collect();
                for child in &r.children {
                    if above.contains(self.molecules[child.0].smiles.as_str()) {
                        out.push(InvariantViolation::SelfAncestor {
                            reaction: r.id,
                            molecule: *child,
                        });
                    }
                }
            }
        }

        out
    }

    // -----------------------------------------------------------------------
    // Propagation internals
    // -----------------------------------------------------------------------

    fn check_molecule(&self, id: MolId) -> Result<(), TreeError> {
        if id.0 < self.molecules.len() {
            Ok(())
        } else {
            Err(TreeError::UnknownMolecule(id))
        }
    }

    fn child_molecules(&self, id: MolId) -> Vec<MolId> {
        self.molecules[id.0]
            .children
            .iter()
            .flat_map(|r| self.reactions[r.0].children.iter().copied())
            .collect()
    }

    fn min_child_rn(&self, m: &MoleculeNode) -> f64 {
        m.children
            .iter()
            .map(|r| self.reactions[r.0].rn)
            .fold(f64::INFINITY, f64::min)
    }

    fn sum_child_rn(&self, r: &ReactionNode) -> f64 {
        r.children.iter().map(|m| self.molecules[m.0].rn).sum()
    }

    fn grandparent_accumulated(&self, r: &ReactionNode) -> f64 {
        self.molecules[r.parent.0]
            .parent
            .map_or(0.0, |gp| self.reactions[gp.0].accumulated_cost)
    }

    /// Root: its own `rn`. Otherwise the parent reaction's accumulated cost
    /// plus, for every reaction on the path to the root, the summed `rn` of
    /// its reactants. A dead reactant anywhere on that path makes the
    /// priority infinite.
    fn priority_formula(&self, id: MolId) -> f64 {
        let m = &self.molecules[id.0];
        let Some(parent) = m.parent else {
            return m.rn;
        };
        let mut priority = self.reactions[parent.0].accumulated_cost;
        let mut current = Some(parent);
        while let Some(rxn) = current {
            let r = &self.reactions[rxn.0];
            priority += self.sum_child_rn(r);
            current = self.molecules[r.parent.0].parent;
        }
        priority
    }

    fn init_reaction(&mut self, id: RxnId) {
        let r = &self.reactions[id.0];
        debug_assert!(r.is_open, "reaction initialized twice");
        let rn = self.sum_child_rn(r);
        let has_found = r.children.iter().all(|m| self.molecules[m.0].has_found);
        let accumulated = r.cost + self.grandparent_accumulated(r);
        let r = &mut self.reactions[id.0];
        r.rn = rn;
        r.has_found = has_found;
        r.accumulated_cost = accumulated;
        r.is_open = false;
    }

    fn init_molecule(&mut self, id: MolId) {
        debug_assert!(self.molecules[id.0].is_open(), "molecule initialized twice");
        self.molecules[id.0].state = MoleculeState::Expanded;
        self.rescan_molecule(id);
        self.propagate_up(id);
    }

    fn close(&mut self, id: MolId) {
        let m = &mut self.molecules[id.0];
        m.state = MoleculeState::Dead;
        m.rn = f64::INFINITY;
        self.propagate_up(id);
    }

    /// Re-derive `rn` and `has_found` of an expanded molecule from its
    /// children. Returns whether either value changed.
    fn rescan_molecule(&mut self, id: MolId) -> bool {
        let m = &self.molecules[id.0];
        let rn = self.min_child_rn(m);
        let has_found = m.has_found || m.children.iter().any(|r| self.reactions[r.0].has_found);
        let m = &mut self.molecules[id.0];
        let changed = rn.to_bits() != m.rn.to_bits() || has_found != m.has_found;
        m.rn = rn;
        m.has_found = has_found;
        changed
    }

    fn propagate_up(&mut self, start: MolId) {
        let mut current = start;
        while let Some(rxn) = self.molecules[current.0].parent {
            let r = &self.reactions[rxn.0];
            let rn = self.sum_child_rn(r);
            let has_found = r.children.iter().all(|m| self.molecules[m.0].has_found);
            let parent = r.parent;
            let r = &mut self.reactions[rxn.0];
            tracing::trace!(reaction = %rxn, delta = cost_delta(r.rn, rn), "reaction update");
            r.rn = rn;
            r.has_found = has_found;

            if !self.rescan_molecule(parent) {
                break;
            }
            current = parent;
        }
    }
}

/// Validated batch value estimate.
fn estimate_costs(estimator: &dyn ValueEstimator, molecules: &[String]) -> Result<Vec<f64>, TreeError> {
    let costs = estimator.estimate(molecules);
    if costs.len() != molecules.len() {
        return Err(TreeError::EstimatorArity {
            expected: molecules.len(),
            actual: costs.len(),
        });
    }
    for (smiles, &value) in molecules.iter().zip(&costs) {
        if !value.is_finite() || value < 0.0 {
            return Err(TreeError::InvalidEstimate {
                smiles: smiles.clone(),
                value,
            });
        }
    }
    Ok(costs)
}

/// `new - old`, defined as 0 when both are the same infinity.
fn cost_delta(old: f64, new: f64) -> f64 {
    if old.to_bits() == new.to_bits() {
        0.0
    } else {
        new - old
    }
}

fn costs_match(expected: f64, actual: f64) -> bool {
    if expected.is_infinite() || actual.is_infinite() {
        return expected.to_bits() == actual.to_bits();
    }
    (expected - actual).abs() <= COST_TOLERANCE * expected.abs().max(1.0)
}
