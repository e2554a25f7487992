//! Shared data models for evaluation results, gating, and blame reports.

pub mod rules;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
/// One violation instance. `line` is absent for whole-file command matches.
pub struct MatchRecord {
    pub file: PathBuf,
    pub line: Option<u32>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
/// A per-file soft failure: the file was skipped, the run continued.
pub struct SkippedFile {
    pub file: PathBuf,
    /// Rule being evaluated when the skip happened, when applicable.
    pub rule: Option<String>,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
/// Results of one evaluation run, keyed by rule name.
///
/// Every configured rule appears as a key even when it matched nothing, so
/// printers can report "no issues" per rule. Cross-file ordering within a
/// rule follows discovery order and is not significant.
pub struct EvalOutcome {
    pub pattern: BTreeMap<String, Vec<MatchRecord>>,
    pub command: BTreeMap<String, Vec<MatchRecord>>,
    pub skipped: Vec<SkippedFile>,
}

impl EvalOutcome {
    /// Iterate all (rule, matches) pairs across both evaluator kinds.
    pub fn iter_rules(&self) -> impl Iterator<Item = (&String, &Vec<MatchRecord>)> {
        self.pattern.iter().chain(self.command.iter())
    }
}

#[derive(Debug, Clone, Serialize)]
/// A match with resolved attribution.
///
/// `author` defaults to the explicit `"Unknown"` sentinel and `timestamp`
/// to `None` (sorted last) so printers need no special-casing.
pub struct EnrichedMatch {
    #[serde(flatten)]
    pub record: MatchRecord,
    pub author: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize)]
/// `EvalOutcome` with attribution attached to every match.
pub struct EnrichedOutcome {
    pub pattern: BTreeMap<String, Vec<EnrichedMatch>>,
    pub command: BTreeMap<String, Vec<EnrichedMatch>>,
}

#[derive(Debug, Clone, Serialize)]
/// Per-rule count change between two snapshots. Missing keys count as 0.
pub struct DiffEntry {
    pub rule: String,
    pub previous: u64,
    pub current: u64,
    pub delta: i64,
}

#[derive(Debug, Clone, Serialize)]
/// A rule whose current count exceeds its baseline count.
pub struct Regression {
    pub rule: String,
    pub baseline: u64,
    pub current: u64,
}
