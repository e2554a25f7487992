//! Snapshot codec, baseline store, diff, and the gating rule.
//!
//! A snapshot is the canonical per-rule violation count of one evaluation
//! run. The baseline is the last snapshot persisted by an explicit update;
//! a missing baseline file reads as an all-zero snapshot, never an error.
//! Serialization goes through a `BTreeMap` so repeated saves of the same
//! snapshot are byte-identical.

use crate::error::{RatchetError, Result};
use crate::models::{DiffEntry, EvalOutcome, Regression};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Mapping from rule name to violation count, canonically ordered.
pub type Snapshot = BTreeMap<String, u64>;

/// Count matches per rule across both evaluator kinds.
///
/// Rule names are expected to be unique across kinds; a colliding name has
/// its counts summed, which the caller must avoid relying on.
pub fn to_snapshot(outcome: &EvalOutcome) -> Snapshot {
    let mut counts = Snapshot::new();
    for (name, matches) in outcome.iter_rules() {
        *counts.entry(name.clone()).or_insert(0) += matches.len() as u64;
    }
    counts
}

/// Load the persisted baseline. Absence means "no history yet".
pub fn load_baseline(path: &Path) -> Result<Snapshot> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::new()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&raw).map_err(|e| RatchetError::Config {
        path: path.to_path_buf(),
        reason: format!("baseline file is not a rule-to-count mapping: {e}"),
    })
}

/// Overwrite the baseline wholesale with a canonical serialization.
pub fn save_baseline(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let mut body = serde_json::to_string_pretty(snapshot).map_err(|e| RatchetError::Config {
        path: path.to_path_buf(),
        reason: format!("cannot serialize snapshot: {e}"),
    })?;
    body.push('\n');
    fs::write(path, body)?;
    Ok(())
}

/// Per-rule deltas over the union of keys; a missing key counts as 0.
///
/// Used for human-facing change reports, not for gating.
pub fn diff(current: &Snapshot, previous: &Snapshot) -> Vec<DiffEntry> {
    let keys: BTreeSet<&String> = current.keys().chain(previous.keys()).collect();
    keys.into_iter()
        .map(|rule| {
            let cur = current.get(rule).copied().unwrap_or(0);
            let prev = previous.get(rule).copied().unwrap_or(0);
            DiffEntry {
                rule: rule.clone(),
                previous: prev,
                current: cur,
                delta: cur as i64 - prev as i64,
            }
        })
        .collect()
}

/// The ratchet: a rule regresses iff its current count strictly exceeds
/// its baseline count. Equal or lower counts pass.
pub fn gate(current: &Snapshot, baseline: &Snapshot) -> Vec<Regression> {
    current
        .iter()
        .filter_map(|(rule, &count)| {
            let base = baseline.get(rule).copied().unwrap_or(0);
            (count > base).then(|| Regression {
                rule: rule.clone(),
                baseline: base,
                current: count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchRecord;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn record(file: &str) -> MatchRecord {
        MatchRecord {
            file: PathBuf::from(file),
            line: Some(1),
            content: "x".into(),
        }
    }

    #[test]
    fn test_to_snapshot_counts_and_sums_collisions() {
        let mut outcome = EvalOutcome::default();
        outcome
            .pattern
            .insert("no-print".into(), vec![record("a.py"), record("b.py")]);
        outcome.pattern.insert("no-eval".into(), vec![]);
        // Same name in both kinds: counts sum.
        outcome
            .command
            .insert("no-print".into(), vec![record("c.py")]);

        let snap = to_snapshot(&outcome);
        assert_eq!(snap["no-print"], 3);
        assert_eq!(snap["no-eval"], 0);
    }

    #[test]
    fn test_save_load_round_trip_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ratchet_values.json");
        let snap = Snapshot::from([("b-rule".to_string(), 2), ("a-rule".to_string(), 7)]);

        save_baseline(&path, &snap).unwrap();
        let first = fs::read(&path).unwrap();
        let loaded = load_baseline(&path).unwrap();
        assert_eq!(loaded, snap);

        save_baseline(&path, &loaded).unwrap();
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second, "repeated saves must be byte-identical");
    }

    #[test]
    fn test_missing_baseline_is_empty_not_error() {
        let dir = tempdir().unwrap();
        let snap = load_baseline(&dir.path().join("absent.json")).unwrap();
        assert!(snap.is_empty());
    }

    #[test]
    fn test_malformed_baseline_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ratchet_values.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let err = load_baseline(&path).unwrap_err();
        assert!(matches!(err, RatchetError::Config { .. }));
    }

    #[test]
    fn test_diff_over_key_union() {
        let current = Snapshot::from([("a".to_string(), 3), ("b".to_string(), 1)]);
        let previous = Snapshot::from([("a".to_string(), 2), ("c".to_string(), 4)]);
        let entries = diff(&current, &previous);
        assert_eq!(entries.len(), 3);
        assert_eq!((entries[0].rule.as_str(), entries[0].delta), ("a", 1));
        assert_eq!((entries[1].rule.as_str(), entries[1].delta), ("b", 1));
        assert_eq!(
            (entries[2].rule.as_str(), entries[2].previous, entries[2].delta),
            ("c", 4, -4)
        );
    }

    #[test]
    fn test_gate_fails_only_on_increase() {
        let baseline = Snapshot::from([("no-print".to_string(), 2)]);

        let worse = Snapshot::from([("no-print".to_string(), 3)]);
        let regressions = gate(&worse, &baseline);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].baseline, 2);
        assert_eq!(regressions[0].current, 3);

        let same = Snapshot::from([("no-print".to_string(), 2)]);
        assert!(gate(&same, &baseline).is_empty());

        let better = Snapshot::from([("no-print".to_string(), 1)]);
        assert!(gate(&better, &baseline).is_empty());
    }

    #[test]
    fn test_gate_treats_missing_baseline_key_as_zero() {
        let baseline = Snapshot::new();
        let current = Snapshot::from([("fresh-rule".to_string(), 1)]);
        let regressions = gate(&current, &baseline);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].baseline, 0);
    }
}
