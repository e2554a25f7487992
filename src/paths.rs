//! Project file-universe resolution: root discovery, enumeration, and
//! exclusion filtering.
//!
//! Exclusion patterns follow gitignore conventions (`*` wildcards, trailing
//! `/` for directories, leading `!` negation, `#` comments). Two optional
//! sources feed the matcher: an explicit exclusion list evaluated first,
//! then the version-control ignore file. A missing source is an empty
//! pattern set, never an error.

use crate::error::{RatchetError, Result};
use ignore::gitignore::GitignoreBuilder;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Markers that identify a project root, probed in order per directory.
pub const DEFAULT_MARKERS: &[&str] = &[
    ".git",
    "ratchet.toml",
    "Cargo.toml",
    "pyproject.toml",
    "package.json",
];

/// Walk parent directories from `start` until one contains any marker.
///
/// Deterministic and side-effect free. Fails with `RootNotFound` when the
/// filesystem root is reached without a match.
pub fn find_project_root(start: &Path, markers: &[&str]) -> Result<PathBuf> {
    let mut current = start.canonicalize()?;
    loop {
        if markers.iter().any(|m| current.join(m).exists()) {
            return Ok(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Err(RatchetError::RootNotFound),
        }
    }
}

/// Recursively collect source files under `root`.
///
/// Symbolic links are never followed or included, so cycles and
/// double-counting are impossible. An empty `extensions` list means every
/// regular file; otherwise only files whose extension is listed survive.
/// Returns a set, so duplicates are impossible by construction.
pub fn enumerate_files(root: &Path, extensions: &[String]) -> BTreeSet<PathBuf> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if entry.file_type().is_symlink() || !entry.file_type().is_file() {
            continue;
        }
        if !extensions.is_empty() {
            let matched = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|want| want == e))
                .unwrap_or(false);
            if !matched {
                continue;
            }
        }
        files.insert(entry.path().to_path_buf());
    }
    files
}

/// Return the subset of `files` matched by neither pattern source.
///
/// Pure over its input: the caller's collection is borrowed and never
/// mutated. Patterns are anchored at `root`; the explicit exclusion list is
/// added before the vcs ignore file so later negations can re-include.
pub fn filter_excluded(
    files: &[PathBuf],
    root: &Path,
    exclusion_path: Option<&Path>,
    ignore_path: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let mut builder = GitignoreBuilder::new(root);
    for source in [exclusion_path, ignore_path].into_iter().flatten() {
        for line in read_pattern_lines(source) {
            if let Err(e) = builder.add_line(None, &line) {
                warn!(pattern = %line, error = %e, "ignoring invalid exclusion pattern");
            }
        }
    }
    let matcher = builder.build().map_err(|e| RatchetError::Config {
        path: exclusion_path.unwrap_or(root).to_path_buf(),
        reason: format!("cannot build exclusion matcher: {e}"),
    })?;

    Ok(files
        .iter()
        .filter(|f| {
            let rel = f.strip_prefix(root).unwrap_or(f);
            !matcher.matched_path_or_any_parents(rel, false).is_ignore()
        })
        .cloned()
        .collect())
}

fn read_pattern_lines(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(s) => s.lines().map(|l| l.to_string()).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read pattern source; treating as empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x = 1\n").unwrap();
    }

    #[test]
    fn test_find_root_from_nested_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("ratchet.toml"));
        let nested = root.join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = find_project_root(&nested, DEFAULT_MARKERS).unwrap();
        assert_eq!(found, root.canonicalize().unwrap());
    }

    #[test]
    fn test_find_root_fails_without_marker() {
        let dir = tempdir().unwrap();
        let err = find_project_root(dir.path(), &["definitely-not-a-marker-xyz"]).unwrap_err();
        assert!(matches!(err, RatchetError::RootNotFound));
    }

    #[test]
    fn test_enumerate_skips_symlinks_and_filters_extensions() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a.py"));
        touch(&root.join("b.rs"));
        touch(&root.join("sub/c.py"));
        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("a.py"), root.join("link.py")).unwrap();

        let all = enumerate_files(root, &[]);
        assert!(all.contains(&root.join("a.py")));
        assert!(all.contains(&root.join("b.rs")));
        assert!(!all.contains(&root.join("link.py")));

        let py_only = enumerate_files(root, &["py".to_string()]);
        assert_eq!(py_only.len(), 2);
        assert!(py_only.iter().all(|p| p.extension().unwrap() == "py"));
    }

    #[test]
    fn test_filter_excluded_filename_and_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        // 9 files: 3 at the root, 5 under vendor/, 1 under sub/.
        for name in ["alpha.py", "beta.py", "gamma.py"] {
            touch(&root.join(name));
        }
        for i in 1..=5 {
            touch(&root.join(format!("vendor/v{i}.py")));
        }
        touch(&root.join("sub/keep.py"));
        let files: Vec<PathBuf> = enumerate_files(root, &[]).into_iter().collect();
        assert_eq!(files.len(), 9);

        let excl = root.join("ratchet_excluded.txt");
        fs::write(&excl, "# generated code\ngamma.py\nvendor/\n").unwrap();

        let before = files.clone();
        let kept = filter_excluded(&files, root, Some(&excl), None).unwrap();
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|p| !p.starts_with(root.join("vendor"))));
        assert!(!kept.contains(&root.join("gamma.py")));
        // Purity: the input collection is unchanged.
        assert_eq!(files, before);
    }

    #[test]
    fn test_filter_negation_reincludes() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("one.py"));
        touch(&root.join("keep.py"));
        let files: Vec<PathBuf> = enumerate_files(root, &[]).into_iter().collect();

        let excl = root.join("ratchet_excluded.txt");
        fs::write(&excl, "*.py\n!keep.py\n").unwrap();

        let kept = filter_excluded(&files, root, Some(&excl), None).unwrap();
        assert_eq!(kept, vec![root.join("keep.py")]);
    }

    #[test]
    fn test_filter_concatenates_ignore_file_after_exclusions() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a.py"));
        touch(&root.join("b.py"));
        touch(&root.join("c.py"));
        let files: Vec<PathBuf> = enumerate_files(root, &[]).into_iter().collect();

        let excl = root.join("ratchet_excluded.txt");
        fs::write(&excl, "a.py\n").unwrap();
        let gitignore = root.join(".gitignore");
        fs::write(&gitignore, "b.py\n").unwrap();

        let kept = filter_excluded(&files, root, Some(&excl), Some(&gitignore)).unwrap();
        assert_eq!(kept, vec![root.join("c.py")]);
    }

    #[test]
    fn test_missing_sources_are_empty_sets() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a.py"));
        let files: Vec<PathBuf> = enumerate_files(root, &[]).into_iter().collect();

        let kept = filter_excluded(
            &files,
            root,
            Some(&root.join("absent.txt")),
            Some(&root.join(".gitignore")),
        )
        .unwrap();
        assert_eq!(kept.len(), files.len());
    }
}
