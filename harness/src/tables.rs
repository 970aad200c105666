//! Table-driven collaborators backed by a [`ScenarioFixture`].
//!
//! [`TableDecoder`] stands in for a sequence model: it replays the fixture's
//! ranked rows as beam hypotheses, so it is wrapped in a
//! [`BeamProposer`](synthplan_search::proposer::BeamProposer) exactly like a
//! real decoder would be.

use std::collections::BTreeMap;

use synthplan_kernel::molecule::canonical::{Canonicalizer, SyntaxCanonicalizer};
use synthplan_search::contract::{Direction, ProposalRequest, ValueEstimator};
use synthplan_search::proposer::{BeamDecoder, BeamHypothesis, BeamProposer};

use crate::fixture::{ScenarioFixture, TableEntry};

/// Replays fixture rows as beam output.
#[derive(Debug, Clone)]
pub struct TableDecoder {
    direction: Direction,
    rows: BTreeMap<String, Vec<BeamHypothesis>>,
}

impl TableDecoder {
    /// Build from a canonical-keyed table.
    ///
    /// Rows with probability zero become `-inf` log-probabilities and are
    /// dropped by renormalization downstream.
    #[must_use]
    pub fn new(direction: Direction, table: &BTreeMap<String, Vec<TableEntry>>) -> Self {
        let rows = table
            .iter()
            .map(|(key, entries)| {
                let beams = entries
                    .iter()
                    .map(|e| BeamHypothesis::new(e.smiles.clone(), e.probability.ln()))
                    .collect();
                (key.clone(), beams)
            })
            .collect();
        Self { direction, rows }
    }

    /// Number of keyed inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl BeamDecoder for TableDecoder {
    fn decode(&self, inputs: &[String], request: &ProposalRequest<'_>) -> Vec<Vec<BeamHypothesis>> {
        if self.direction != request.direction {
            tracing::debug!(
                table = self.direction.as_str(),
                request = request.direction.as_str(),
                "table queried in the other direction"
            );
        }
        inputs
            .iter()
            .map(|input| {
                let key = SyntaxCanonicalizer.canonicalize(input).smiles;
                self.rows
                    .get(&key)
                    .map(|beams| beams.iter().take(request.beam_width).cloned().collect())
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Per-molecule cost lookup with a default for unknown molecules.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEstimator {
    values: BTreeMap<String, f64>,
    default: f64,
}

impl TableEstimator {
    #[must_use]
    pub fn new(values: BTreeMap<String, f64>, default: f64) -> Self {
        Self { values, default }
    }
}

impl ValueEstimator for TableEstimator {
    fn estimate(&self, molecules: &[String]) -> Vec<f64> {
        molecules
            .iter()
            .map(|m| self.values.get(m).copied().unwrap_or(self.default))
            .collect()
    }
}

/// Proposer type used for fixture-driven runs.
pub type TableProposer = BeamProposer<TableDecoder, SyntaxCanonicalizer>;

/// Retro proposer, forward proposer and estimator for one fixture.
#[derive(Debug, Clone)]
pub struct FixtureCollaborators {
    pub retro: TableProposer,
    pub forward: TableProposer,
    pub estimator: TableEstimator,
    pub canonicalizer: SyntaxCanonicalizer,
}

impl FixtureCollaborators {
    #[must_use]
    pub fn from_fixture(fixture: &ScenarioFixture) -> Self {
        Self {
            retro: BeamProposer::new(
                TableDecoder::new(Direction::Retro, &fixture.retro),
                SyntaxCanonicalizer,
            ),
            forward: BeamProposer::new(
                TableDecoder::new(Direction::Forward, &fixture.forward),
                SyntaxCanonicalizer,
            ),
            estimator: TableEstimator::new(fixture.values.clone(), fixture.default_value),
            canonicalizer: SyntaxCanonicalizer,
        }
    }

    /// Borrow as the runner's collaborator bundle.
    #[must_use]
    pub fn as_collaborators(&self) -> crate::runner::Collaborators<'_> {
        crate::runner::Collaborators {
            retro: &self.retro,
            forward: &self.forward,
            estimator: &self.estimator,
            canonicalizer: &self.canonicalizer,
        }
    }
}
