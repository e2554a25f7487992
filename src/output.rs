//! Output rendering for report, check, diff, and blame commands.
//!
//! Supports `human` (default) and `json` outputs. JSON composition lives in
//! pure `compose_*` helpers so shapes can be asserted in tests. File paths
//! are displayed relative to the project root.

use crate::models::{
    DiffEntry, EnrichedMatch, EnrichedOutcome, EvalOutcome, MatchRecord, Regression,
};
use owo_colors::OwoColorize;
use serde_json::{json, Value as JsonVal};
use std::path::Path;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn display_path(file: &Path, root: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .to_string()
}

fn truncate(content: &str) -> String {
    if content.chars().count() <= 80 {
        content.to_string()
    } else {
        let head: String = content.chars().take(80).collect();
        format!("{head}...")
    }
}

fn location(m: &MatchRecord, root: &Path) -> String {
    match m.line {
        Some(line) => format!("{}:{}", display_path(&m.file, root), line),
        None => display_path(&m.file, root),
    }
}

/// Print current violations per rule, without baseline context.
pub fn print_report(outcome: &EvalOutcome, root: &Path, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_report_json(outcome, root))
                .unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            for (rule, matches) in outcome.iter_rules() {
                if matches.is_empty() {
                    println!("\n{rule} — no issues found.");
                    continue;
                }
                let header = format!("{rule} — matched {} issue(s):", matches.len());
                if color {
                    println!("\n{}", header.bold());
                } else {
                    println!("\n{header}");
                }
                for m in matches {
                    println!("  → {}: {}", location(m, root), truncate(&m.content));
                }
            }
            if !outcome.skipped.is_empty() {
                let note = format!("skipped {} file(s); see warnings", outcome.skipped.len());
                if color {
                    eprintln!("{}", note.yellow());
                } else {
                    eprintln!("{note}");
                }
            }
        }
    }
}

/// Print the gating verdict: every regressed rule with baseline vs current
/// counts and the current match locations.
pub fn print_gate(
    regressions: &[Regression],
    outcome: &EvalOutcome,
    root: &Path,
    output: &str,
) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_gate_json(regressions, outcome, root))
                .unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            if regressions.is_empty() {
                let ok = "Ratchet holds: no rule exceeded its baseline.";
                if color {
                    println!("{}", ok.green().bold());
                } else {
                    println!("{ok}");
                }
                return;
            }
            for r in regressions {
                let head = format!(
                    "{}: baseline={}, current={} (+{})",
                    r.rule,
                    r.baseline,
                    r.current,
                    r.current - r.baseline
                );
                if color {
                    println!("{} {}", "✖".red().bold(), head.bold());
                } else {
                    println!("✖ {head}");
                }
                let matches = outcome
                    .iter_rules()
                    .filter(|(name, _)| *name == &r.rule)
                    .flat_map(|(_, m)| m.iter());
                for m in matches {
                    println!("  → {}: {}", location(m, root), truncate(&m.content));
                }
            }
        }
    }
}

/// Print per-rule deltas; only changed rules are shown in human mode.
pub fn print_diff(entries: &[DiffEntry], output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_diff_json(entries)).unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            let mut changed = 0;
            for e in entries {
                if e.delta == 0 {
                    continue;
                }
                changed += 1;
                let sign = if e.delta > 0 { "+" } else { "-" };
                let line = format!(
                    "  {}: {} → {} ({sign}{})",
                    e.rule,
                    e.previous,
                    e.current,
                    e.delta.abs()
                );
                if color && e.delta > 0 {
                    println!("{}", line.red());
                } else if color {
                    println!("{}", line.green());
                } else {
                    println!("{line}");
                }
            }
            if changed == 0 {
                println!("There are no differences.");
            }
        }
    }
}

/// Print enriched issues sorted oldest-first, truncated per rule.
pub fn print_blame(enriched: &EnrichedOutcome, root: &Path, max_count: usize, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_blame_json(enriched, root, max_count))
                .unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            print_blame_section("Pattern rules", &enriched.pattern, root, max_count, color);
            print_blame_section("Command rules", &enriched.command, root, max_count, color);
        }
    }
}

fn print_blame_section(
    section: &str,
    issues: &std::collections::BTreeMap<String, Vec<EnrichedMatch>>,
    root: &Path,
    max_count: usize,
    color: bool,
) {
    for (rule, matches) in issues {
        if matches.is_empty() {
            println!("\n{section} — {rule}: no issues found.");
            continue;
        }
        let plural = if matches.len() == 1 { "" } else { "s" };
        let header = format!("{section} — {rule} ({} issue{plural}):", matches.len());
        println!("\n{}", "-".repeat(40));
        if color {
            println!("{}", header.bold());
        } else {
            println!("{header}");
        }
        println!("{}", "-".repeat(40));
        for m in matches.iter().take(max_count) {
            let when = m
                .timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "Unknown".to_string());
            println!(
                "  → {}  by {} at {}",
                location(&m.record, root),
                m.author,
                when
            );
            println!("       {}", truncate(&m.record.content));
        }
        if matches.len() > max_count {
            println!("  … and {} more", matches.len() - max_count);
        }
    }
}

/// Compose report JSON (pure) for testing/snapshot purposes.
pub fn compose_report_json(outcome: &EvalOutcome, root: &Path) -> JsonVal {
    let section = |issues: &std::collections::BTreeMap<String, Vec<MatchRecord>>| {
        let mut obj = serde_json::Map::new();
        for (rule, matches) in issues {
            obj.insert(rule.clone(), matches_json(matches, root));
        }
        JsonVal::Object(obj)
    };
    let skipped: Vec<_> = outcome
        .skipped
        .iter()
        .map(|s| {
            json!({
                "file": display_path(&s.file, root),
                "rule": s.rule,
                "reason": s.reason,
            })
        })
        .collect();
    json!({
        "pattern": section(&outcome.pattern),
        "command": section(&outcome.command),
        "skipped": skipped,
    })
}

/// Compose gate JSON (pure) for testing/snapshot purposes.
pub fn compose_gate_json(
    regressions: &[Regression],
    outcome: &EvalOutcome,
    root: &Path,
) -> JsonVal {
    let items: Vec<_> = regressions
        .iter()
        .map(|r| {
            let matches: Vec<&MatchRecord> = outcome
                .iter_rules()
                .filter(|(name, _)| *name == &r.rule)
                .flat_map(|(_, m)| m.iter())
                .collect();
            json!({
                "rule": r.rule,
                "baseline": r.baseline,
                "current": r.current,
                "delta": r.current - r.baseline,
                "matches": matches
                    .iter()
                    .map(|m| json!({
                        "file": display_path(&m.file, root),
                        "line": m.line,
                        "content": m.content,
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "passed": regressions.is_empty(),
        "regressions": items,
    })
}

/// Compose diff JSON (pure) for testing/snapshot purposes.
pub fn compose_diff_json(entries: &[DiffEntry]) -> JsonVal {
    json!({
        "entries": serde_json::to_value(entries).unwrap_or_default(),
        "changed": entries.iter().filter(|e| e.delta != 0).count(),
    })
}

/// Compose blame JSON (pure). Per-rule matches are truncated to
/// `max_count` for display while the full count is reported alongside.
pub fn compose_blame_json(enriched: &EnrichedOutcome, root: &Path, max_count: usize) -> JsonVal {
    let section = |issues: &std::collections::BTreeMap<String, Vec<EnrichedMatch>>| {
        let mut obj = serde_json::Map::new();
        for (rule, matches) in issues {
            let shown: Vec<_> = matches
                .iter()
                .take(max_count)
                .map(|m| {
                    json!({
                        "file": display_path(&m.record.file, root),
                        "line": m.record.line,
                        "content": m.record.content,
                        "author": m.author,
                        "timestamp": m.timestamp.map(|t| t.to_rfc3339()),
                    })
                })
                .collect();
            obj.insert(
                rule.clone(),
                json!({ "count": matches.len(), "matches": shown }),
            );
        }
        JsonVal::Object(obj)
    };
    json!({
        "pattern": section(&enriched.pattern),
        "command": section(&enriched.command),
    })
}

fn matches_json(matches: &[MatchRecord], root: &Path) -> JsonVal {
    JsonVal::Array(
        matches
            .iter()
            .map(|m| {
                json!({
                    "file": display_path(&m.file, root),
                    "line": m.line,
                    "content": m.content,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn outcome_with(rule: &str, count: usize) -> EvalOutcome {
        let mut outcome = EvalOutcome::default();
        let matches = (0..count)
            .map(|i| MatchRecord {
                file: PathBuf::from("/repo/src/a.py"),
                line: Some(i as u32 + 1),
                content: format!("print({i})"),
            })
            .collect();
        outcome.pattern.insert(rule.to_string(), matches);
        outcome
    }

    #[test]
    fn test_compose_report_json_shape() {
        let outcome = outcome_with("no-print", 2);
        let out = compose_report_json(&outcome, Path::new("/repo"));
        assert_eq!(out["pattern"]["no-print"][0]["file"], "src/a.py");
        assert_eq!(out["pattern"]["no-print"][1]["line"], 2);
        assert!(out["skipped"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_compose_gate_json_includes_locations_and_delta() {
        let outcome = outcome_with("no-print", 3);
        let regressions = vec![Regression {
            rule: "no-print".into(),
            baseline: 2,
            current: 3,
        }];
        let out = compose_gate_json(&regressions, &outcome, Path::new("/repo"));
        assert_eq!(out["passed"], false);
        assert_eq!(out["regressions"][0]["delta"], 1);
        assert_eq!(
            out["regressions"][0]["matches"].as_array().unwrap().len(),
            3
        );
    }

    #[test]
    fn test_compose_diff_json_counts_changes() {
        let entries = vec![
            DiffEntry {
                rule: "a".into(),
                previous: 2,
                current: 2,
                delta: 0,
            },
            DiffEntry {
                rule: "b".into(),
                previous: 0,
                current: 4,
                delta: 4,
            },
        ];
        let out = compose_diff_json(&entries);
        assert_eq!(out["changed"], 1);
        assert_eq!(out["entries"][1]["delta"], 4);
    }

    #[test]
    fn test_compose_blame_json_truncates_but_reports_full_count() {
        let mut enriched = EnrichedOutcome::default();
        let matches: Vec<EnrichedMatch> = (0..5)
            .map(|i| EnrichedMatch {
                record: MatchRecord {
                    file: PathBuf::from("/repo/a.py"),
                    line: Some(i + 1),
                    content: "x".into(),
                },
                author: "Unknown".into(),
                timestamp: None,
            })
            .collect();
        enriched.pattern.insert("no-print".into(), matches);

        let out = compose_blame_json(&enriched, Path::new("/repo"), 2);
        assert_eq!(out["pattern"]["no-print"]["count"], 5);
        assert_eq!(
            out["pattern"]["no-print"]["matches"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            out["pattern"]["no-print"]["matches"][0]["timestamp"],
            JsonVal::Null
        );
    }
}
