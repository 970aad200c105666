//! Binary that plans every target of a scenario fixture and prints
//! deterministic output lines for cross-process verification.
//!
//! Usage: `search_fixture <fixture.json> [parallelism]`
//!
//! Output: `fixture_digest=...` then one `target=...` line per target.

use synthplan_harness::config::PlannerConfig;
use synthplan_harness::fixture::ScenarioFixture;
use synthplan_harness::runner::{plan_batch, BatchSummary};
use synthplan_harness::tables::FixtureCollaborators;
use synthplan_kernel::digest::canon::canonical_json_bytes;
use synthplan_kernel::digest::hash::{canonical_hash, HashDomain};
use synthplan_kernel::molecule::canonical::SyntaxCanonicalizer;

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().expect("usage: search_fixture <fixture.json> [parallelism]");
    let parallelism: usize = args
        .next()
        .map_or(1, |s| s.parse().expect("parallelism is a positive integer"));

    let fixture = ScenarioFixture::load(std::path::Path::new(&path), &SyntaxCanonicalizer).expect("fixture loads");
    let config = PlannerConfig {
        parallelism,
        ..PlannerConfig::default()
    };
    let collaborators = FixtureCollaborators::from_fixture(&fixture);
    let terminals = fixture.terminal_set();
    let results = plan_batch(
        &fixture.targets,
        &terminals,
        &config,
        collaborators.as_collaborators(),
        None,
    );

    println!("fixture_digest={}", fixture.digest().expect("fixture digest"));
    for (target, result) in fixture.targets.iter().zip(&results) {
        let outcome = result.as_ref().expect("target plans");
        let route_digest = outcome
            .route
            .as_ref()
            .map_or_else(|| "none".to_string(), |r| r.digest().expect("route digest").to_string());
        println!(
            "target={} solved={} steps={} termination={} report_digest={} route_digest={}",
            target.name,
            outcome.report.solved,
            outcome.report.steps,
            outcome.report.termination,
            outcome.report_digest,
            route_digest,
        );
    }

    let summary = BatchSummary::from_results(&fixture.targets, &results);
    let summary_bytes = canonical_json_bytes(&summary.to_json_value()).expect("summary canonical");
    println!(
        "summary_digest={}",
        canonical_hash(HashDomain::Artifact, &summary_bytes)
    );
}
