//! Blame enrichment: attach author/timestamp attribution to matches.
//!
//! Line matches resolve through `git blame` restricted to the single line;
//! whole-file command matches fall back to the last commit touching the
//! file. Historical lookups are orders of magnitude slower than rule
//! evaluation, so successful per-line results are memoized in the
//! `BlameCache` and consulted first. A cache hit is trusted only when the
//! cached line content equals the current match content, because cached
//! content is advisory: the file may have changed since the write.
//!
//! Attribution never fails a run. Any lookup problem (file not under
//! version control, git error, timeout) resolves to the `"Unknown"` author
//! sentinel with no timestamp.

use crate::cache::{BlameCache, BlameRecord};
use crate::evaluate::run_with_timeout;
use crate::models::{EnrichedMatch, EnrichedOutcome, EvalOutcome, MatchRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, warn};

/// Explicit sentinel for unresolved attribution.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Wall-clock limit per git invocation, mirroring the command evaluator.
const BLAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve attribution for every match in `outcome`.
///
/// Matches within each rule come back sorted by timestamp ascending with
/// unresolved timestamps last, ready for truncated display. Fresh per-line
/// lookups are written back to the cache in one batch at the end.
pub fn enrich_with_blame(
    root: &Path,
    cache: &BlameCache,
    outcome: &EvalOutcome,
) -> EnrichedOutcome {
    let mut pending: Vec<BlameRecord> = Vec::new();
    let pattern = enrich_map(root, cache, &outcome.pattern, &mut pending);
    let command = enrich_map(root, cache, &outcome.command, &mut pending);
    if let Err(e) = cache.create_or_update_many(&pending) {
        warn!(error = %e, "failed to write blame results back to cache");
    }
    EnrichedOutcome { pattern, command }
}

fn enrich_map(
    root: &Path,
    cache: &BlameCache,
    issues: &BTreeMap<String, Vec<MatchRecord>>,
    pending: &mut Vec<BlameRecord>,
) -> BTreeMap<String, Vec<EnrichedMatch>> {
    issues
        .iter()
        .map(|(rule, matches)| {
            let mut enriched: Vec<EnrichedMatch> = matches
                .iter()
                .map(|m| {
                    let (author, timestamp) = resolve(root, cache, m, pending);
                    EnrichedMatch {
                        record: m.clone(),
                        author,
                        timestamp,
                    }
                })
                .collect();
            sort_for_display(&mut enriched);
            (rule.clone(), enriched)
        })
        .collect()
}

/// Timestamp ascending; unresolved timestamps sort as "latest possible".
pub fn sort_for_display(matches: &mut [EnrichedMatch]) {
    matches.sort_by_key(|m| m.timestamp.unwrap_or(DateTime::<Utc>::MAX_UTC));
}

fn resolve(
    root: &Path,
    cache: &BlameCache,
    m: &MatchRecord,
    pending: &mut Vec<BlameRecord>,
) -> (String, Option<DateTime<Utc>>) {
    let Some(line) = m.line else {
        // Whole-file command match: the per-line query does not apply, and
        // the line-keyed cache cannot hold it.
        return match last_commit_for_file(root, &m.file) {
            Some((author, ts)) => (author, Some(ts)),
            None => (UNKNOWN_AUTHOR.to_string(), None),
        };
    };

    let key = cache_key(root, &m.file);
    match cache.get(line, &key) {
        Ok(Some(rec)) if rec.line_content == m.content => {
            debug!(file = %key, line, "blame cache hit");
            return (rec.author, Some(rec.timestamp));
        }
        Ok(_) => {}
        Err(e) => warn!(file = %key, line, error = %e, "blame cache lookup failed"),
    }

    match blame_line(root, &m.file, line) {
        Some((author, ts)) => {
            pending.push(BlameRecord {
                file_name: key,
                line_number: line,
                line_content: m.content.clone(),
                author: author.clone(),
                timestamp: ts,
            });
            (author, Some(ts))
        }
        None => (UNKNOWN_AUTHOR.to_string(), None),
    }
}

/// Cache keys are project-root-relative so the cache survives checkouts at
/// different absolute paths.
fn cache_key(root: &Path, file: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .into_owned()
}

fn blame_line(root: &Path, file: &Path, line: u32) -> Option<(String, DateTime<Utc>)> {
    let mut cmd = Command::new("git");
    cmd.arg("blame")
        .arg("-L")
        .arg(format!("{line},{line}"))
        .arg("--porcelain")
        .arg(file)
        .current_dir(root);
    let output = run_with_timeout(cmd, BLAME_TIMEOUT).ok()??;
    parse_porcelain(&output)
}

fn last_commit_for_file(root: &Path, file: &Path) -> Option<(String, DateTime<Utc>)> {
    let mut cmd = Command::new("git");
    cmd.arg("log")
        .arg("-1")
        .arg("--format=%an;%at")
        .arg("--")
        .arg(file)
        .current_dir(root);
    let output = run_with_timeout(cmd, BLAME_TIMEOUT).ok()??;
    parse_author_line(output.trim())
}

/// Pull `author` and `author-time` out of `git blame --porcelain` output.
fn parse_porcelain(output: &str) -> Option<(String, DateTime<Utc>)> {
    let mut author: Option<String> = None;
    let mut time: Option<DateTime<Utc>> = None;
    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("author ") {
            author = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("author-time ") {
            let secs: i64 = rest.trim().parse().ok()?;
            time = DateTime::from_timestamp(secs, 0);
        }
        if author.is_some() && time.is_some() {
            break;
        }
    }
    Some((author?, time?))
}

/// Parse one `%an;%at` line from `git log`.
fn parse_author_line(line: &str) -> Option<(String, DateTime<Utc>)> {
    let (author, epoch) = line.rsplit_once(';')?;
    if author.is_empty() {
        return None;
    }
    let secs: i64 = epoch.trim().parse().ok()?;
    let ts = DateTime::from_timestamp(secs, 0)?;
    Some((author.to_string(), ts))
}
