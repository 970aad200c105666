//! Synthetic planning regimes shared by the synthplan benchmark suites.
//!
//! Each regime is a generated [`ScenarioFixture`] plus the configuration it is
//! planned under. Molecule names are alphanumeric placeholders (`M<level>x<index>`)
//! that pass the syntax canonicalizer unchanged.

use serde_json::{json, Map, Value};

use synthplan_harness::config::PlannerConfig;
use synthplan_harness::fixture::ScenarioFixture;
use synthplan_harness::runner::{plan_batch, PlanError, PlanOutcome};
use synthplan_harness::tables::FixtureCollaborators;
use synthplan_kernel::digest::hash::{canonical_hash, ContentHash, HashDomain};
use synthplan_kernel::molecule::canonical::SyntaxCanonicalizer;
use synthplan_search::policy::SearchPolicy;

/// A named fixture and the configuration it is planned under.
pub struct Regime {
    pub name: &'static str,
    pub fixture: ScenarioFixture,
    pub config: PlannerConfig,
}

fn molecule(level: usize, index: usize) -> String {
    format!("M{level}x{index}")
}

fn entry(smiles: &str, probability: f64) -> Value {
    json!({"smiles": smiles, "probability": probability})
}

fn parse(doc: &Value) -> ScenarioFixture {
    ScenarioFixture::from_json_str(&doc.to_string(), &SyntaxCanonicalizer)
        .expect("generated fixture is valid")
}

fn unfiltered(max_steps: u64) -> PlannerConfig {
    PlannerConfig {
        policy: SearchPolicy {
            max_steps,
            lower_bound: 0.0,
            consistency_check: false,
            ..SearchPolicy::default()
        },
        ..PlannerConfig::default()
    }
}

/// Linear chain `M0x0 -> M1x0 -> ... -> T` of `depth` single-reactant steps.
///
/// # Panics
///
/// Panics if the generated fixture fails validation.
#[must_use]
pub fn chain(depth: usize) -> Regime {
    let mut retro = Map::new();
    for level in 0..depth {
        let next = if level + 1 == depth {
            "T".to_string()
        } else {
            molecule(level + 1, 0)
        };
        retro.insert(molecule(level, 0), json!([entry(&next, 1.0)]));
    }
    let doc = json!({
        "terminals": ["T"],
        "retro": retro,
        "targets": [{"name": "chain", "smiles": molecule(0, 0)}],
    });
    Regime {
        name: "chain",
        fixture: parse(&doc),
        config: unfiltered(depth as u64 + 1),
    }
}

/// Full AND-OR tree: every molecule above `depth` has `width` two-reactant
/// reactions with descending probabilities; molecules at `depth` are
/// terminal. Early stop is off, so the whole budget is spent propagating.
///
/// # Panics
///
/// Panics if the generated fixture fails validation.
#[must_use]
pub fn branching(depth: usize, width: usize, max_steps: u64) -> Regime {
    let fanout = 2 * width;
    let mut retro = Map::new();
    let mut terminals = Vec::new();
    let mut level_size = 1;
    for level in 0..=depth {
        for index in 0..level_size {
            if level == depth {
                terminals.push(molecule(level, index));
                continue;
            }
            let base = index * fanout;
            let row: Vec<Value> = (0..width)
                .map(|r| {
                    let a = molecule(level + 1, base + 2 * r);
                    let b = molecule(level + 1, base + 2 * r + 1);
                    #[allow(clippy::cast_precision_loss)]
                    let p = 1.0 / (r as f64 + 2.0);
                    entry(&format!("{a}.{b}"), p)
                })
                .collect();
            retro.insert(molecule(level, index), Value::Array(row));
        }
        level_size *= fanout;
    }
    let doc = json!({
        "terminals": terminals,
        "retro": retro,
        "targets": [{"name": "branching", "smiles": molecule(0, 0)}],
    });
    let mut config = unfiltered(max_steps);
    config.policy.early_stop = None;
    Regime {
        name: "branching",
        fixture: parse(&doc),
        config,
    }
}

/// Root with `width` single-reactant reactions whose reactants have no
/// proposals: the search closes every branch and ends with no open nodes.
///
/// # Panics
///
/// Panics if the generated fixture fails validation.
#[must_use]
pub fn dead_end(width: usize) -> Regime {
    #[allow(clippy::cast_precision_loss)]
    let p = 1.0 / width as f64;
    let row: Vec<Value> = (0..width).map(|i| entry(&molecule(1, i), p)).collect();
    let doc = json!({
        "terminals": ["T"],
        "retro": {molecule(0, 0): row},
        "targets": [{"name": "dead_end", "smiles": molecule(0, 0)}],
    });
    Regime {
        name: "dead_end",
        fixture: parse(&doc),
        config: unfiltered(width as u64 + 1),
    }
}

/// `width` candidate reactions per molecule with a matching forward row for
/// each, so every expansion runs the consistency check.
///
/// # Panics
///
/// Panics if the generated fixture fails validation.
#[must_use]
pub fn consistency_checked(depth: usize, width: usize) -> Regime {
    let mut retro = Map::new();
    let mut forward = Map::new();
    let mut terminals = Vec::new();
    for level in 0..depth {
        let product = molecule(level, 0);
        let next = molecule(level + 1, 0);
        let mut row = vec![entry(&next, 0.5)];
        for side in 0..width.saturating_sub(1) {
            let side_reactant = molecule(level + 1, side + 1);
            terminals.push(side_reactant.clone());
            #[allow(clippy::cast_precision_loss)]
            let p = 0.5 / width as f64;
            row.push(entry(&format!("{next}.{side_reactant}"), p));
            forward.insert(
                format!("{next}.{side_reactant}"),
                json!([entry(&product, 0.9), entry("Q", 0.1)]),
            );
        }
        forward.insert(next.clone(), json!([entry(&product, 0.9), entry("Q", 0.1)]));
        retro.insert(product, Value::Array(row));
    }
    terminals.push(molecule(depth, 0));
    let doc = json!({
        "terminals": terminals,
        "retro": retro,
        "forward": forward,
        "targets": [{"name": "consistency_checked", "smiles": molecule(0, 0)}],
    });
    let mut config = PlannerConfig::default();
    config.policy.max_steps = depth as u64 + 1;
    config.policy.lower_bound = 0.0;
    Regime {
        name: "consistency_checked",
        fixture: parse(&doc),
        config,
    }
}

/// Every regime at its default benchmark size.
#[must_use]
pub fn all_regimes() -> Vec<Regime> {
    vec![
        chain(32),
        branching(3, 2, 40),
        dead_end(64),
        consistency_checked(16, 4),
    ]
}

/// Plan every target of a regime.
#[must_use]
pub fn plan_regime(regime: &Regime) -> Vec<Result<PlanOutcome, PlanError>> {
    let collaborators = FixtureCollaborators::from_fixture(&regime.fixture);
    let terminals = regime.fixture.terminal_set();
    plan_batch(
        &regime.fixture.targets,
        &terminals,
        &regime.config,
        collaborators.as_collaborators(),
        None,
    )
}

/// Digest over every report digest of a regime run, in target order.
///
/// Benchmarks compare this across repeated runs before timing anything, so a
/// nondeterministic search is caught instead of measured.
///
/// # Panics
///
/// Panics if any target fails to plan.
#[must_use]
pub fn guard_digest(results: &[Result<PlanOutcome, PlanError>]) -> ContentHash {
    let mut bytes = Vec::new();
    for result in results {
        let outcome = result.as_ref().expect("benchmark targets plan");
        bytes.extend_from_slice(outcome.report_digest.as_str().as_bytes());
        bytes.push(b'\n');
    }
    canonical_hash(HashDomain::BenchGuard, &bytes)
}
