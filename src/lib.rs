//! Ratchet core library.
//!
//! A regression gate ("ratchet") for codebase hygiene: declaratively
//! configured rules are evaluated against every tracked file, and a run
//! fails only when a rule's violation count increases over the stored
//! baseline. A companion blame subsystem attributes each violation to the
//! author and timestamp that introduced it, memoized in a persistent cache.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `paths`: Project root discovery, file enumeration, exclusion filtering.
//! - `models`: Rule schema and evaluation/report data models.
//! - `evaluate`: Pattern and command rule evaluators.
//! - `snapshot`: Snapshot codec, baseline store, diff, and the gating rule.
//! - `cache`: Persistent blame cache (SQLite).
//! - `blame`: Blame enrichment via historical lookups.
//! - `output`: Human/JSON printers for report/check/diff/blame.
//! - `error`: Fatal error taxonomy.

pub mod blame;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod models;
pub mod output;
pub mod paths;
pub mod snapshot;
