//! Persistent blame cache backed by an embedded SQLite store.
//!
//! Records are uniquely keyed by (file name, line number); a later write
//! for the same key fully replaces content, author, and timestamp. Cached
//! line content is advisory only: source files change between writes, so a
//! key hit does not guarantee the content still matches the live line, and
//! consumers must compare before trusting the attribution.
//!
//! Every logical operation opens its own short-lived connection and
//! transaction, and schema creation is idempotent, so concurrent tool
//! invocations against the same cache file cannot corrupt state or
//! deadlock each other.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS blames (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    line_number INTEGER NOT NULL,
    line_content TEXT NOT NULL,
    author TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    UNIQUE(file_name, line_number)
);
";

const UPSERT: &str = "
INSERT INTO blames (file_name, line_number, line_content, author, timestamp)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(file_name, line_number) DO UPDATE SET
    line_content = excluded.line_content,
    author = excluded.author,
    timestamp = excluded.timestamp
";

#[derive(Debug, Clone, PartialEq)]
/// One cached attribution, keyed by (file_name, line_number).
pub struct BlameRecord {
    pub file_name: String,
    pub line_number: u32,
    pub line_content: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
/// Handle to the on-disk cache. Cheap to construct; connections are opened
/// per operation, never held for the process lifetime.
pub struct BlameCache {
    path: PathBuf,
}

impl BlameCache {
    /// Open (or create) the cache at `path`, ensuring the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let cache = Self {
            path: path.to_path_buf(),
        };
        cache.connect()?;
        Ok(cache)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    /// Insert the record, or overwrite content/author/timestamp when the
    /// key already exists.
    pub fn create_or_update(&self, record: &BlameRecord) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            UPSERT,
            params![
                record.file_name,
                record.line_number,
                record.line_content,
                record.author,
                record.timestamp,
            ],
        )?;
        Ok(())
    }

    /// Upsert many records in one transaction.
    ///
    /// Semantically equivalent to repeated `create_or_update` calls; it
    /// exists because a commit per record dominates runtime on large match
    /// sets.
    pub fn create_or_update_many(&self, records: &[BlameRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT)?;
            for record in records {
                stmt.execute(params![
                    record.file_name,
                    record.line_number,
                    record.line_content,
                    record.author,
                    record.timestamp,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Look up the record for a key. A missing key is `Ok(None)`.
    pub fn get(&self, line_number: u32, file_name: &str) -> Result<Option<BlameRecord>> {
        let conn = self.connect()?;
        let record = conn
            .query_row(
                "SELECT file_name, line_number, line_content, author, timestamp
                 FROM blames WHERE line_number = ?1 AND file_name = ?2",
                params![line_number, file_name],
                |row| {
                    Ok(BlameRecord {
                        file_name: row.get(0)?,
                        line_number: row.get(1)?,
                        line_content: row.get(2)?,
                        author: row.get(3)?,
                        timestamp: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn record(n: u32, content: &str, author: &str, year: i32) -> BlameRecord {
        BlameRecord {
            file_name: "example.py".into(),
            line_number: n,
            line_content: content.into(),
            author: author.into(),
            timestamp: Utc.with_ymd_and_hms(year, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let dir = tempdir().unwrap();
        let cache = BlameCache::open(&dir.path().join("blame.db")).unwrap();
        assert!(cache.get(42, "example.py").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_single_row() {
        let dir = tempdir().unwrap();
        let cache = BlameCache::open(&dir.path().join("blame.db")).unwrap();

        cache
            .create_or_update(&record(42, "print('hello')", "Author1", 2020))
            .unwrap();
        cache
            .create_or_update(&record(42, "print('updated')", "Author2", 2021))
            .unwrap();

        let got = cache.get(42, "example.py").unwrap().unwrap();
        assert_eq!(got.author, "Author2");
        assert_eq!(got.line_content, "print('updated')");
        assert_eq!(got.timestamp, Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap());

        // Batch path hits the same row too.
        cache
            .create_or_update_many(&[record(42, "print('batch')", "Author3", 2022)])
            .unwrap();
        let got = cache.get(42, "example.py").unwrap().unwrap();
        assert_eq!(got.author, "Author3");
        assert_eq!(got.line_content, "print('batch')");
    }

    #[test]
    fn test_batch_equivalent_to_repeated_singles() {
        let dir = tempdir().unwrap();
        let singles = BlameCache::open(&dir.path().join("singles.db")).unwrap();
        let batched = BlameCache::open(&dir.path().join("batched.db")).unwrap();

        let r1 = record(1, "a", "A", 2020);
        let r2 = record(2, "b", "B", 2021);
        let r1b = record(1, "a2", "A2", 2022);

        singles.create_or_update(&r1).unwrap();
        singles.create_or_update(&r2).unwrap();
        singles.create_or_update(&r1b).unwrap();

        batched
            .create_or_update_many(&[r1.clone(), r2.clone(), r1b.clone()])
            .unwrap();

        for n in [1, 2] {
            assert_eq!(
                singles.get(n, "example.py").unwrap(),
                batched.get(n, "example.py").unwrap()
            );
        }
    }

    #[test]
    fn test_repeated_opens_are_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blame.db");
        for _ in 0..10 {
            let cache = BlameCache::open(&path).unwrap();
            cache.create_or_update(&record(7, "x", "A", 2020)).unwrap();
        }
        let cache = BlameCache::open(&path).unwrap();
        assert!(cache.get(7, "example.py").unwrap().is_some());
    }
}
