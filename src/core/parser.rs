//! Filename grammar parser for backup listing entries.
//!
//! Two grammars are recognized, tried in order:
//!
//! 1. Delta:  `vm_delta_<tag>_<dir>/<date>_<machine>`
//! 2. Simple: `<date>_<tag>_<machine>.xva`
//!
//! A delta match suppresses the simple attempt entirely. Anything matching
//! neither grammar is not a backup (directory markers, unrelated files) and
//! yields no record.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::core::models::{BackupKind, BackupRecord};

/// Date tokens are strict UTC timestamps like `20210101T120000Z`.
const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

static DELTA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^vm_delta_(.*)_([^/]+)/([^_]+)_(.*)$").unwrap());

static SIMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^_]+)_([^_]+)_(.*)\.xva$").unwrap());

/// Parse one listing entry into a backup record.
///
/// Returns `None` for entries that match neither grammar, and also for
/// entries whose date token matches the grammar's character class but is
/// not a valid calendar date. A malformed entry is never an error: absence
/// of data is the documented behavior for foreign files.
pub fn parse(remote_id: &str, entry: &str) -> Option<BackupRecord> {
    if let Some(caps) = DELTA_RE.captures(entry) {
        let timestamp = parse_date(&caps[3])?;
        return Some(BackupRecord {
            kind: BackupKind::Delta,
            timestamp,
            machine_name: caps[4].to_string(),
            tag: caps[1].to_string(),
            path: entry.to_string(),
            remote_id: remote_id.to_string(),
        });
    }

    let caps = SIMPLE_RE.captures(entry)?;
    let timestamp = parse_date(&caps[1])?;
    Some(BackupRecord {
        kind: BackupKind::Simple,
        timestamp,
        machine_name: caps[3].to_string(),
        tag: caps[2].to_string(),
        path: entry.to_string(),
        remote_id: remote_id.to_string(),
    })
}

fn parse_date(token: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(token, DATE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}
