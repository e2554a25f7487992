//! Rule evaluators: line-pattern matching and external-command checks.
//!
//! Pattern rules read every tracked file line by line (1-based numbering)
//! and record a match wherever the compiled regex matches within the line.
//! Command rules pipe each file path to the rule's shell template and treat
//! every non-empty trimmed stdout line as one violation; the engine never
//! interprets the tool's semantics beyond that, and a non-zero exit status
//! alone is not a violation.
//!
//! Both evaluators recover locally from per-file trouble: an undecodable
//! file or a timed-out command is recorded as a `SkippedFile` and the run
//! continues with the remaining files and rules.

use crate::models::rules::{CommandRule, PatternRule, RuleSet};
use crate::models::{EvalOutcome, MatchRecord, SkippedFile};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::warn;

/// Hard wall-clock limit for one external-command invocation.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Evaluate all rules against the resolved file universe.
///
/// `regex_only` skips command rules, `command_only` skips pattern rules
/// (both set means nothing runs). This is the engine entry point consumed
/// by the CLI layer.
pub fn evaluate(
    rules: &RuleSet,
    files: &[PathBuf],
    regex_only: bool,
    command_only: bool,
) -> EvalOutcome {
    let mut outcome = EvalOutcome::default();
    if !command_only {
        let (pattern, mut skipped) = evaluate_patterns(files, &rules.patterns);
        outcome.pattern = pattern;
        outcome.skipped.append(&mut skipped);
    }
    if !regex_only {
        let (command, mut skipped) =
            evaluate_commands(files, &rules.commands, COMMAND_TIMEOUT);
        outcome.command = command;
        outcome.skipped.append(&mut skipped);
    }
    outcome
}

/// Run every pattern rule against every file, line by line.
///
/// Every rule name appears in the result map even with zero matches. A file
/// that cannot be decoded as text is skipped for all pattern rules.
pub fn evaluate_patterns(
    files: &[PathBuf],
    rules: &BTreeMap<String, PatternRule>,
) -> (BTreeMap<String, Vec<MatchRecord>>, Vec<SkippedFile>) {
    let mut results: BTreeMap<String, Vec<MatchRecord>> = rules
        .keys()
        .map(|name| (name.clone(), Vec::new()))
        .collect();
    let mut skipped = Vec::new();
    if rules.is_empty() {
        return (results, skipped);
    }

    for file in files {
        let content = match fs::read_to_string(file) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "skipping undecodable file");
                skipped.push(SkippedFile {
                    file: file.clone(),
                    rule: None,
                    reason: format!("cannot read as text: {e}"),
                });
                continue;
            }
        };
        for (lineno, line) in content.lines().enumerate() {
            for (name, rule) in rules {
                if rule.regex.is_match(line) {
                    results
                        .entry(name.clone())
                        .or_default()
                        .push(MatchRecord {
                            file: file.clone(),
                            line: Some(lineno as u32 + 1),
                            content: line.trim().to_string(),
                        });
                }
            }
        }
    }
    (results, skipped)
}

/// Run every command rule once per file, piping the file path to the
/// template via a shell pipeline.
///
/// A timed-out invocation is killed, logged, recorded as a skip, and
/// counts as "no violation for this file"; it never aborts the run.
pub fn evaluate_commands(
    files: &[PathBuf],
    rules: &BTreeMap<String, CommandRule>,
    timeout: Duration,
) -> (BTreeMap<String, Vec<MatchRecord>>, Vec<SkippedFile>) {
    let mut results: BTreeMap<String, Vec<MatchRecord>> = rules
        .keys()
        .map(|name| (name.clone(), Vec::new()))
        .collect();
    let mut skipped = Vec::new();

    for (name, rule) in rules {
        for file in files {
            // `$0` carries the path into the pipeline unquoted-safe.
            let script = format!("echo \"$0\" | {}", rule.command);
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&script).arg(file);
            match run_with_timeout(cmd, timeout) {
                Ok(Some(output)) => {
                    for line in output.lines() {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            results
                                .entry(name.clone())
                                .or_default()
                                .push(MatchRecord {
                                    file: file.clone(),
                                    line: None,
                                    content: trimmed.to_string(),
                                });
                        }
                    }
                }
                Ok(None) => {
                    warn!(
                        rule = %name,
                        file = %file.display(),
                        timeout_secs = timeout.as_secs_f64(),
                        "command timed out; treating as no violation"
                    );
                    skipped.push(SkippedFile {
                        file: file.clone(),
                        rule: Some(name.clone()),
                        reason: format!("command timed out after {:?}", timeout),
                    });
                }
                Err(e) => {
                    warn!(rule = %name, file = %file.display(), error = %e, "command failed to run");
                    skipped.push(SkippedFile {
                        file: file.clone(),
                        rule: Some(name.clone()),
                        reason: format!("command failed to run: {e}"),
                    });
                }
            }
        }
    }
    (results, skipped)
}

/// Spawn a command, capture stdout, and enforce a wall-clock timeout.
///
/// Returns `Ok(None)` on timeout. The child leads its own process group, so
/// the deadline kill takes the whole pipeline down with it, not just the
/// shell wrapper; a grandchild holding the stdout pipe open cannot stretch
/// the wait past the deadline. Stdout is drained on a dedicated reader so a
/// chatty child cannot stall on a full pipe. Exit status is intentionally
/// not inspected.
pub(crate) fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
) -> std::io::Result<Option<String>> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn()?;
    let stdout = match child.stdout.take() {
        Some(s) => s,
        None => {
            let _ = child.wait();
            return Ok(Some(String::new()));
        }
    };
    let reader = std::thread::spawn(move || {
        let mut stdout = stdout;
        let mut buf = String::new();
        let _ = stdout.read_to_string(&mut buf);
        buf
    });

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait()? {
            Some(_) => break,
            None if Instant::now() >= deadline => {
                kill_process_group(&mut child);
                // Not joined: if anything survived the kill it still owns
                // the pipe's write end, and the reader would block on it.
                drop(reader);
                return Ok(None);
            }
            None => std::thread::sleep(Duration::from_millis(10)),
        }
    }
    Ok(Some(reader.join().unwrap_or_default()))
}

/// Kill the child and every descendant in its process group, then reap it.
fn kill_process_group(child: &mut std::process::Child) {
    #[cfg(unix)]
    {
        // The group id equals the child's pid (it was made group leader
        // at spawn); a negative pid addresses the whole group.
        let _ = Command::new("kill")
            .args(["-KILL", "--", &format!("-{}", child.id())])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
    let _ = child.wait();
}
