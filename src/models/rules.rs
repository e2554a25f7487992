//! Rule file schema and loading.
//!
//! A rule file declares two tables: `[pattern-rules.<name>]` entries carry a
//! regular expression tested against every line of every tracked file, and
//! `[command-rules.<name>]` entries carry a shell command template whose
//! non-empty stdout lines are treated as violations.
//!
//! Pattern rules may also carry a human-readable `description` plus `valid`
//! and `invalid` sample lines. The samples are consumed by an external
//! config validator, not by the evaluation engine; they are parsed and kept
//! so the loader rejects malformed files in one place.
//!
//! Rule names are expected to be unique across both tables. A collision is
//! not rejected here; counts for a colliding name are summed at snapshot
//! time and the outcome is the caller's responsibility.

use crate::error::{RatchetError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
/// Raw rule file as written on disk, before regex compilation.
struct RuleFile {
    #[serde(default, rename = "pattern-rules")]
    pattern_rules: BTreeMap<String, PatternRuleDef>,
    #[serde(default, rename = "command-rules")]
    command_rules: BTreeMap<String, CommandRuleDef>,
}

#[derive(Debug, Deserialize)]
struct PatternRuleDef {
    regex: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    valid: Vec<String>,
    #[serde(default)]
    invalid: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CommandRuleDef {
    command: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug)]
/// A pattern rule with its regex compiled once at load time.
pub struct PatternRule {
    pub regex: Regex,
    pub description: Option<String>,
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

#[derive(Debug)]
/// A command rule delegating to an external tool via a shell template.
pub struct CommandRule {
    pub command: String,
    pub description: Option<String>,
}

#[derive(Debug, Default)]
/// All rules of one run, immutable once loaded.
pub struct RuleSet {
    pub patterns: BTreeMap<String, PatternRule>,
    pub commands: BTreeMap<String, CommandRule>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.commands.is_empty()
    }
}

/// Load and validate a rule file. Malformed TOML or an invalid regex is a
/// fatal configuration error.
pub fn load_rules(path: &Path) -> Result<RuleSet> {
    let raw = fs::read_to_string(path).map_err(|e| RatchetError::Config {
        path: path.to_path_buf(),
        reason: format!("cannot read rule file: {e}"),
    })?;
    let file: RuleFile = toml::from_str(&raw).map_err(|e| RatchetError::Config {
        path: path.to_path_buf(),
        reason: format!("rule file is not valid TOML: {e}"),
    })?;

    let mut patterns = BTreeMap::new();
    for (name, def) in file.pattern_rules {
        let regex = Regex::new(&def.regex).map_err(|e| RatchetError::Config {
            path: path.to_path_buf(),
            reason: format!("invalid regex for rule '{name}': {e}"),
        })?;
        patterns.insert(
            name,
            PatternRule {
                regex,
                description: def.description,
                valid: def.valid,
                invalid: def.invalid,
            },
        );
    }

    let commands = file
        .command_rules
        .into_iter()
        .map(|(name, def)| {
            (
                name,
                CommandRule {
                    command: def.command,
                    description: def.description,
                },
            )
        })
        .collect();

    Ok(RuleSet { patterns, commands })
}
