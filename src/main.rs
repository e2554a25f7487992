//! Ratchet CLI binary entry point.
//! Delegates to library modules for evaluation, gating, and blame, and
//! prints results in the requested output mode.

use clap::Parser;
use ratchet::cli::{Cli, Commands, RunArgs};
use ratchet::config::{self, Effective};
use ratchet::error::Result;
use ratchet::models::rules::load_rules;
use ratchet::models::EvalOutcome;
use ratchet::{blame, cache::BlameCache, evaluate, output, paths, snapshot};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Commands::Report { run } => {
            let (eff, outcome) = evaluate_run(&run, None)?;
            output::print_report(&outcome, &eff.repo_root, &eff.output);
            Ok(0)
        }
        Commands::Check { run } => {
            let (eff, outcome) = evaluate_run(&run, None)?;
            let current = snapshot::to_snapshot(&outcome);
            let baseline = snapshot::load_baseline(&eff.baseline_path())?;
            let regressions = snapshot::gate(&current, &baseline);
            output::print_gate(&regressions, &outcome, &eff.repo_root, &eff.output);
            Ok(if regressions.is_empty() { 0 } else { 1 })
        }
        Commands::Update { run } => {
            let (eff, outcome) = evaluate_run(&run, None)?;
            let current = snapshot::to_snapshot(&outcome);
            snapshot::save_baseline(&eff.baseline_path(), &current)?;
            println!("baseline updated: {}", eff.baseline_path().display());
            Ok(0)
        }
        Commands::Diff { run } => {
            let (eff, outcome) = evaluate_run(&run, None)?;
            let current = snapshot::to_snapshot(&outcome);
            let baseline = snapshot::load_baseline(&eff.baseline_path())?;
            let entries = snapshot::diff(&current, &baseline);
            output::print_diff(&entries, &eff.output);
            Ok(0)
        }
        Commands::Blame { run, max_count } => {
            let (eff, outcome) = evaluate_run(&run, max_count)?;
            let cache = BlameCache::open(&eff.cache_path())?;
            let enriched = blame::enrich_with_blame(&eff.repo_root, &cache, &outcome);
            output::print_blame(&enriched, &eff.repo_root, eff.max_count, &eff.output);
            Ok(0)
        }
    }
}

/// Resolve config, load rules, build the file universe, and evaluate.
fn evaluate_run(args: &RunArgs, cli_max_count: Option<usize>) -> Result<(Effective, EvalOutcome)> {
    let eff = config::resolve_effective(
        args.repo_root.as_deref(),
        args.rules.as_deref(),
        args.output.as_deref(),
        cli_max_count,
    )?;
    if eff.output != "json" && !eff.config_found {
        eprintln!("note: no ratchet.toml found; using defaults.");
    }

    let rules = load_rules(&eff.rules_path())?;
    let universe: Vec<PathBuf> = paths::enumerate_files(&eff.repo_root, &eff.extensions)
        .into_iter()
        .collect();
    let files = paths::filter_excluded(
        &universe,
        &eff.repo_root,
        Some(&eff.exclude_path()),
        Some(&eff.ignore_path()),
    )?;

    // The tool's own artifacts and vcs internals never count as debt.
    let own = [
        eff.rules_path(),
        eff.exclude_path(),
        eff.baseline_path(),
        eff.cache_path(),
    ];
    let git_dir = eff.repo_root.join(".git");
    let files: Vec<PathBuf> = files
        .into_iter()
        .filter(|f| !f.starts_with(&git_dir) && !own.contains(f))
        .collect();

    let outcome = evaluate::evaluate(&rules, &files, args.regex_only, args.command_only);
    Ok((eff, outcome))
}
