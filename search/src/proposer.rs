//! Beam-decoder adapter implementing [`ReactionProposer`].
//!
//! A sequence model yields raw beam hypotheses with log-probabilities.
//! [`BeamProposer`] turns them into candidate sets:
//!
//! 1. canonicalize each output;
//! 2. drop invalid outputs, the excluded placeholders (`""`, `"CC"`), and any
//!    molecule named in the request's `exclude` set;
//! 3. keep the first occurrence of duplicate canonical outputs;
//! 4. map `log_prob` to `exp(log_prob)` and renormalize to sum 1 per input.

use std::collections::HashSet;

use synthplan_kernel::molecule::canonical::{Canonicalizer, EXCLUDED_OUTPUTS};

use crate::contract::{CandidateSet, Proposal, ProposalRequest, ReactionProposer};

/// One raw decoder output.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamHypothesis {
    /// Decoded SMILES, not yet canonicalized.
    pub smiles: String,
    /// Natural-log probability of the sequence.
    pub log_prob: f64,
}

impl BeamHypothesis {
    /// Construct a hypothesis.
    #[must_use]
    pub fn new(smiles: impl Into<String>, log_prob: f64) -> Self {
        Self {
            smiles: smiles.into(),
            log_prob,
        }
    }
}

/// Beam-search decoder over a single-step reaction model.
///
/// Must return exactly `inputs.len()` hypothesis lists, each ranked best
/// first and at most `request.beam_width` long.
pub trait BeamDecoder: Send + Sync {
    /// Decode a batch of inputs.
    fn decode(&self, inputs: &[String], request: &ProposalRequest<'_>) -> Vec<Vec<BeamHypothesis>>;
}

/// [`ReactionProposer`] built from a decoder and a canonicalizer.
#[derive(Debug, Clone, Default)]
pub struct BeamProposer<D, C> {
    decoder: D,
    canonicalizer: C,
}

impl<D: BeamDecoder, C: Canonicalizer> BeamProposer<D, C> {
    /// Wrap a decoder and canonicalizer.
    pub fn new(decoder: D, canonicalizer: C) -> Self {
        Self {
            decoder,
            canonicalizer,
        }
    }

    /// The wrapped decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    fn post_process(&self, beams: Vec<BeamHypothesis>, request: &ProposalRequest<'_>) -> CandidateSet {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out: CandidateSet = Vec::with_capacity(beams.len());
        for hyp in beams {
            let canon = self.canonicalizer.canonicalize(&hyp.smiles);
            if !canon.is_valid
                || EXCLUDED_OUTPUTS.contains(&canon.smiles.as_str())
                || request.exclude.contains(&canon.smiles)
            {
                continue;
            }
            if !seen.insert(canon.smiles.clone()) {
                continue;
            }
            out.push(Proposal::new(canon.smiles, hyp.log_prob.exp()));
        }
        let total: f64 = out.iter().map(|p| p.probability).sum();
        if total > 0.0 && total.is_finite() {
            for p in &mut out {
                p.probability /= total;
            }
        }
        out
    }
}

impl<D: BeamDecoder, C: Canonicalizer> ReactionProposer for BeamProposer<D, C> {
    fn propose(&self, molecules: &[String], request: &ProposalRequest<'_>) -> Vec<CandidateSet> {
        self.decoder
            .decode(molecules, request)
            .into_iter()
            .map(|beams| self.post_process(beams, request))
            .collect()
    }
}
