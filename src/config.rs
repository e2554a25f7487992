//! Configuration discovery and effective settings resolution.
//!
//! Ratchet reads `ratchet.toml|yaml|yml` from the project root and merges it
//! with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `rules`: `ratchet_rules.toml`
//! - `output`: `human`
//! - `max_count`: 10 (blame display truncation per rule)
//! - `exclude_file`: `ratchet_excluded.txt`
//! - `baseline_file`: `ratchet_values.json`
//! - `cache_file`: `.ratchet_blame.db`
//! - `[files] extensions`: empty (every regular file)
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::Result;
use crate::paths::{find_project_root, DEFAULT_MARKERS};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RULES_FILE: &str = "ratchet_rules.toml";
pub const DEFAULT_EXCLUDE_FILE: &str = "ratchet_excluded.txt";
pub const DEFAULT_BASELINE_FILE: &str = "ratchet_values.json";
pub const DEFAULT_CACHE_FILE: &str = ".ratchet_blame.db";
pub const VCS_IGNORE_FILE: &str = ".gitignore";
pub const DEFAULT_MAX_COUNT: usize = 10;

#[derive(Debug, Default, Deserialize, Clone)]
/// File-universe configuration section under `[files]`.
pub struct FilesCfg {
    /// Extensions to scan; empty or absent means all regular files.
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `ratchet.toml|yaml`.
pub struct RatchetConfig {
    pub rules: Option<String>,
    pub output: Option<String>,
    pub max_count: Option<usize>,
    pub exclude_file: Option<String>,
    pub baseline_file: Option<String>,
    pub cache_file: Option<String>,
    #[serde(default)]
    pub files: Option<FilesCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub rules: String,
    pub output: String,
    pub max_count: usize,
    pub extensions: Vec<String>,
    pub exclude_file: String,
    pub baseline_file: String,
    pub cache_file: String,
    /// Whether a config file was discovered at the root (vs pure defaults).
    pub config_found: bool,
}

impl Effective {
    pub fn rules_path(&self) -> PathBuf {
        self.repo_root.join(&self.rules)
    }
    pub fn exclude_path(&self) -> PathBuf {
        self.repo_root.join(&self.exclude_file)
    }
    pub fn ignore_path(&self) -> PathBuf {
        self.repo_root.join(VCS_IGNORE_FILE)
    }
    pub fn baseline_path(&self) -> PathBuf {
        self.repo_root.join(&self.baseline_file)
    }
    pub fn cache_path(&self) -> PathBuf {
        self.repo_root.join(&self.cache_file)
    }
}

/// Load `RatchetConfig` from `ratchet.toml` or `ratchet.yaml|yml` if present.
pub fn load_config(root: &Path) -> Option<RatchetConfig> {
    let toml_path = root.join("ratchet.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).ok()?;
        let cfg: RatchetConfig = toml::from_str(&s).ok()?;
        return Some(cfg);
    }
    for yml in ["ratchet.yaml", "ratchet.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).ok()?;
            let cfg: RatchetConfig = serde_yaml::from_str(&s).ok()?;
            return Some(cfg);
        }
    }
    None
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
///
/// Fails when no project root can be found from the start directory.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_rules: Option<&str>,
    cli_output: Option<&str>,
    cli_max_count: Option<usize>,
) -> Result<Effective> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = find_project_root(&start, DEFAULT_MARKERS)?;
    let cfg = load_config(&repo_root);
    let config_found = cfg.is_some();
    let cfg = cfg.unwrap_or_default();

    let rules = cli_rules
        .map(|s| s.to_string())
        .or(cfg.rules)
        .unwrap_or_else(|| DEFAULT_RULES_FILE.to_string());
    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    let max_count = cli_max_count
        .or(cfg.max_count)
        .unwrap_or(DEFAULT_MAX_COUNT);
    let extensions = cfg
        .files
        .and_then(|f| f.extensions)
        .unwrap_or_default();
    let exclude_file = cfg
        .exclude_file
        .unwrap_or_else(|| DEFAULT_EXCLUDE_FILE.to_string());
    let baseline_file = cfg
        .baseline_file
        .unwrap_or_else(|| DEFAULT_BASELINE_FILE.to_string());
    let cache_file = cfg
        .cache_file
        .unwrap_or_else(|| DEFAULT_CACHE_FILE.to_string());

    Ok(Effective {
        repo_root,
        rules,
        output,
        max_count,
        extensions,
        exclude_file,
        baseline_file,
        cache_file,
        config_found,
    })
}
