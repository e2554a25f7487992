//! CLI argument parsing via `clap`.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ratchet",
    version,
    about = "Regression gate for codebase hygiene",
    long_about = "Ratchet — evaluate declarative hygiene rules against a project tree and fail only when a rule's violation count increases over the stored baseline. Existing debt is tolerated; new debt is not.\n\nConfiguration precedence: CLI > ratchet.toml > defaults.",
    after_help = "Examples:\n  ratchet report\n  ratchet check --rules ratchet_rules.toml\n  ratchet update\n  ratchet diff --output json\n  ratchet blame --max-count 5",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Debug)]
/// Flags shared by every evaluating subcommand.
pub struct RunArgs {
    #[arg(long, help = "Project root (default: discovered from current dir)")]
    pub repo_root: Option<String>,
    #[arg(long, help = "Path to the rule file (default: ratchet_rules.toml)")]
    pub rules: Option<String>,
    #[arg(long, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Evaluate pattern rules only")]
    pub regex_only: bool,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Evaluate command rules only")]
    pub command_only: bool,
}

#[derive(Subcommand)]
/// Supported subcommands for evaluating, gating, and attributing violations.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current ratchet version.")]
    Version,
    /// Evaluate rules and print every current violation
    #[command(
        about = "Print current violations per rule",
        long_about = "Evaluate all configured rules against the tracked file universe and print the matches, without consulting the baseline.",
        after_help = "Examples:\n  ratchet report\n  ratchet report --regex-only --output json"
    )]
    Report {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Gate against the stored baseline
    #[command(
        about = "Fail if any rule's count increased",
        long_about = "Evaluate all rules and compare per-rule counts with the stored baseline. Exits 1 when any count strictly exceeds its baseline; a missing baseline gates against zero.",
        after_help = "Examples:\n  ratchet check\n  ratchet check --output json"
    )]
    Check {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Overwrite the baseline with current counts
    #[command(
        about = "Record current counts as the new baseline",
        long_about = "Evaluate all rules and persist the per-rule counts wholesale, replacing any previous baseline."
    )]
    Update {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Compare current counts against the baseline
    #[command(
        about = "Show per-rule count deltas vs the baseline",
        long_about = "Evaluate all rules and print how each count changed relative to the stored baseline. Informational only; never fails the run."
    )]
    Diff {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Attribute violations to authors via history
    #[command(
        about = "Print violations with blame attribution",
        long_about = "Evaluate all rules and resolve who introduced each match (and when) via historical blame, memoized in the on-disk cache. Unresolvable matches show as Unknown.",
        after_help = "Examples:\n  ratchet blame\n  ratchet blame --max-count 5"
    )]
    Blame {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, help = "Maximum matches to display per rule (default: 10)")]
        max_count: Option<usize>,
    },
}
