//! `synthplan`: plan synthesis routes for fixture targets from the command line.
//!
//! Routes are printed to stdout; logs go to stderr or `--log-file`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use synthplan_harness::artifacts::{write_batch_summary, write_target_artifacts};
use synthplan_harness::config::PlannerConfig;
use synthplan_harness::fixture::{ScenarioFixture, TargetSpec};
use synthplan_harness::logging;
use synthplan_harness::runner::{plan_batch, BatchSummary};
use synthplan_harness::tables::FixtureCollaborators;
use synthplan_kernel::molecule::canonical::SyntaxCanonicalizer;

#[derive(Parser, Debug)]
#[command(name = "synthplan")]
#[command(about = "Best-first AND-OR retrosynthesis planning over table-driven fixtures")]
struct Args {
    /// Scenario fixture (JSON): terminals, value table, proposal tables, targets
    #[arg(short, long, value_name = "FILE")]
    fixture: PathBuf,

    /// Planner configuration (TOML); defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Plan this SMILES instead of the fixture's targets
    #[arg(short, long, value_name = "SMILES")]
    target: Option<String>,

    /// Name for --target
    #[arg(long, value_name = "NAME", requires = "target")]
    name: Option<String>,

    /// Plan only the named fixture targets (repeatable)
    #[arg(long, value_name = "NAME", conflicts_with = "target")]
    only: Vec<String>,

    /// Write per-target artifact directories and a batch summary here
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Override policy.max_steps
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Override policy.early_stop
    #[arg(long, value_name = "N")]
    early_stop: Option<u64>,

    /// Spend the whole step budget even after a route is found
    #[arg(long, conflicts_with = "early_stop")]
    no_early_stop: bool,

    /// Override parallelism
    #[arg(short = 'j', long, value_name = "N")]
    parallelism: Option<usize>,

    /// Skip the forward consistency check
    #[arg(long)]
    no_consistency_check: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.log_file.as_deref()) {
        eprintln!("logging init failed: {e}");
    }
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "synthplan failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<PlannerConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    if let Some(n) = args.max_steps {
        config.policy.max_steps = n;
    }
    if let Some(n) = args.early_stop {
        config.policy.early_stop = Some(n);
    }
    if args.no_early_stop {
        config.policy.early_stop = None;
    }
    if let Some(n) = args.parallelism {
        config.parallelism = n;
    }
    if args.no_consistency_check {
        config.policy.consistency_check = false;
    }
    config.validate()?;
    Ok(config)
}

fn select_targets(args: &Args, fixture: &ScenarioFixture) -> Result<Vec<TargetSpec>, String> {
    if let Some(smiles) = &args.target {
        return Ok(vec![TargetSpec::new(
            args.name.as_deref().unwrap_or("target"),
            smiles.clone(),
        )]);
    }
    if args.only.is_empty() {
        if fixture.targets.is_empty() {
            return Err("fixture has no targets; pass --target".to_string());
        }
        return Ok(fixture.targets.clone());
    }
    args.only
        .iter()
        .map(|name| {
            fixture
                .target(name)
                .cloned()
                .ok_or_else(|| format!("fixture has no target named {name:?}"))
        })
        .collect()
}

fn run(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let fixture = ScenarioFixture::load(&args.fixture, &SyntaxCanonicalizer)?;
    let targets = select_targets(args, &fixture)?;
    tracing::info!(
        fixture = %args.fixture.display(),
        fixture_digest = %fixture.digest()?,
        targets = targets.len(),
        "loaded fixture"
    );

    let collaborators = FixtureCollaborators::from_fixture(&fixture);
    let terminals = fixture.terminal_set();
    let results = plan_batch(
        &targets,
        &terminals,
        &config,
        collaborators.as_collaborators(),
        None,
    );

    for (target, result) in targets.iter().zip(&results) {
        match result {
            Ok(outcome) => {
                match &outcome.route {
                    Some(route) => print!("{}", route.render()),
                    None => println!(
                        "no route {} ({}): {} after {} step(s)",
                        target.name, outcome.report.target, outcome.report.termination, outcome.report.steps
                    ),
                }
                if let Some(out) = &args.out {
                    write_target_artifacts(out, outcome)?;
                }
            }
            Err(e) => println!("failed {}: {e}", target.name),
        }
    }

    let summary = BatchSummary::from_results(&targets, &results);
    if let Some(out) = &args.out {
        let written = write_batch_summary(out, &summary)?;
        tracing::info!(path = %written.path.display(), digest = %written.digest, "wrote batch summary");
    }
    println!(
        "solved {}/{} target(s), {} failed",
        summary.solved_count(),
        summary.entries.len(),
        summary.failed_count()
    );

    Ok(if summary.failed_count() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
