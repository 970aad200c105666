//! Best-route extraction from a solved search.
//!
//! Breadth-first from the root: every solved molecule contributes the solved
//! child reaction with the lowest accumulated cost (ties broken by the lower
//! reaction id), and that reaction's reactants are visited next.

use std::collections::VecDeque;
use std::fmt::Write as _;

use serde_json::{json, Value};
use synthplan_kernel::digest::canon::{canonical_json_bytes, to_micros, CanonError};
use synthplan_kernel::digest::hash::{canonical_hash, ContentHash, HashDomain};

use crate::node::{MolId, MoleculeState, RxnId};
use crate::report::{ReactionSummary, SearchReport};

/// A reactant in a route step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReactant {
    pub molecule: MolId,
    pub smiles: String,
    /// Purchasable; the route ends here.
    pub terminal: bool,
}

/// One reaction in the extracted route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    /// Depth of the product (root = 0).
    pub depth: usize,
    pub product: MolId,
    pub product_smiles: String,
    pub reaction: RxnId,
    pub reactants: Vec<RouteReactant>,
    /// `exp(-cost)` of the reaction.
    pub probability: f64,
    pub cost: f64,
}

/// The cheapest solved decomposition of the target.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRoute {
    pub target: String,
    pub name: String,
    /// Steps in breadth-first order from the root.
    pub steps: Vec<RouteStep>,
}

impl SynthesisRoute {
    /// Extract the best route, or `None` if the search is unsolved.
    ///
    /// A terminal target yields a route with no steps.
    #[must_use]
    pub fn from_report(report: &SearchReport) -> Option<Self> {
        let root = report.root()?;
        if !root.has_found {
            return None;
        }

        let mut steps = Vec::new();
        let mut queue = VecDeque::from([root.id]);
        while let Some(mol_id) = queue.pop_front() {
            let mol = report.molecules.get(mol_id.0)?;
            if !mol.has_found || mol.state == MoleculeState::Terminal {
                continue;
            }
            let best = best_reaction(report, &mol.children)?;
            let reactants = best
                .children
                .iter()
                .map(|c| {
                    report.molecules.get(c.0).map(|m| RouteReactant {
                        molecule: m.id,
                        smiles: m.smiles.clone(),
                        terminal: m.state == MoleculeState::Terminal,
                    })
                })
                .collect::<Option<Vec<_>>>()?;
            queue.extend(best.children.iter().copied());
            steps.push(RouteStep {
                depth: mol.depth,
                product: mol.id,
                product_smiles: mol.smiles.clone(),
                reaction: best.id,
                reactants,
                probability: (-best.cost).exp(),
                cost: best.cost,
            });
        }

        Some(Self {
            target: report.target.clone(),
            name: report.name.clone(),
            steps,
        })
    }

    /// Sum of reaction costs along the route.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.steps.iter().map(|s| s.cost).sum()
    }

    /// Terminal reactants in route order.
    #[must_use]
    pub fn starting_materials(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.reactants.iter())
            .filter(|r| r.terminal)
            .map(|r| r.smiles.as_str())
            .collect()
    }

    /// Plain-text rendering, one reaction per line, indented by depth.
    ///
    /// Terminal reactants are marked with `*`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "route {} ({}): {} step(s), total cost {:.4}",
            self.name,
            self.target,
            self.steps.len(),
            self.total_cost()
        );
        for step in &self.steps {
            let reactants: Vec<String> = step
                .reactants
                .iter()
                .map(|r| {
                    if r.terminal {
                        format!("{}*", r.smiles)
                    } else {
                        r.smiles.clone()
                    }
                })
                .collect();
            let _ = writeln!(
                out,
                "{:indent$}{} => {}  [{} p={:.4}]",
                "",
                step.product_smiles,
                reactants.join(" + "),
                step.reaction,
                step.probability,
                indent = step.depth * 2
            );
        }
        out
    }

    /// Convert to a `serde_json::Value` for canonical serialization.
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        json!({
            "name": self.name,
            "steps": self.steps.iter().map(|s| json!({
                "cost_micros": to_micros(s.cost),
                "depth": s.depth,
                "product": s.product.0,
                "product_smiles": s.product_smiles,
                "reactants": s.reactants.iter().map(|r| json!({
                    "molecule": r.molecule.0,
                    "smiles": r.smiles,
                    "terminal": r.terminal,
                })).collect::<Vec<_>>(),
                "reaction": s.reaction.0,
            })).collect::<Vec<_>>(),
            "target": self.target,
        })
    }

    /// Content hash of the canonical JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails.
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = canonical_json_bytes(&self.to_json_value())?;
        Ok(canonical_hash(HashDomain::SynthesisRoute, &bytes))
    }
}

fn best_reaction<'r>(report: &'r SearchReport, children: &[RxnId]) -> Option<&'r ReactionSummary> {
    let mut best: Option<&ReactionSummary> = None;
    for id in children {
        let r = report.reactions.get(id.0)?;
        if !r.has_found {
            continue;
        }
        let better = match best {
            None => true,
            Some(b) => r.accumulated_cost < b.accumulated_cost,
        };
        if better {
            best = Some(r);
        }
    }
    best
}
