//! Catalog builder: turns one remote's raw listing into per-machine
//! backup summaries.

use std::collections::HashMap;

use tracing::trace;

use crate::core::models::{BackupKind, BackupRecord, MachineBackupSummary, RemoteCatalog};
use crate::core::parser;

/// Build the catalog for one remote from its directory listing.
///
/// Entries matching neither grammar are skipped silently. Zero matching
/// entries produce an empty catalog, which callers must keep distinct
/// from a failed listing fetch.
pub fn build(remote_id: &str, entries: &[String]) -> RemoteCatalog {
    let mut groups: HashMap<String, Vec<BackupRecord>> = HashMap::new();

    for entry in entries {
        match parser::parse(remote_id, entry) {
            Some(record) => {
                groups
                    .entry(record.machine_name.clone())
                    .or_default()
                    .push(record);
            }
            None => trace!(entry = %entry, "entry matches no backup grammar, skipping"),
        }
    }

    let mut catalog = RemoteCatalog::new();
    for (machine_name, records) in groups {
        if let Some(summary) = summarize(records) {
            catalog.insert(machine_name, summary);
        }
    }
    catalog
}

/// All backups of a single machine, in listing order.
///
/// Used to offer a caller any backup of a machine rather than only the
/// latest one.
pub fn backups_for_machine(
    remote_id: &str,
    entries: &[String],
    machine_name: &str,
) -> Vec<BackupRecord> {
    entries
        .iter()
        .filter_map(|entry| parser::parse(remote_id, entry))
        .filter(|record| record.machine_name == machine_name)
        .collect()
}

/// Reduce one machine's records to a summary. Records arrive in listing
/// order; `latest` only moves on a strictly greater timestamp, so the
/// first-seen record survives a tie.
fn summarize(records: Vec<BackupRecord>) -> Option<MachineBackupSummary> {
    let mut simple_count = 0;
    let mut delta_count = 0;
    let mut latest: Option<BackupRecord> = None;

    for record in records {
        match record.kind {
            BackupKind::Simple => simple_count += 1,
            BackupKind::Delta => delta_count += 1,
        }
        latest = match latest {
            Some(current) if record.timestamp > current.timestamp => Some(record),
            Some(current) => Some(current),
            None => Some(record),
        };
    }

    latest.map(|latest| MachineBackupSummary {
        latest,
        simple_count,
        delta_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entries(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_simple_backups_and_picks_latest() {
        let listing = entries(&[
            "20210101T120000Z_weekly_vm1.xva",
            "20210102T120000Z_weekly_vm1.xva",
        ]);

        let catalog = build("remote-1", &listing);

        assert_eq!(catalog.len(), 1);
        let summary = &catalog["vm1"];
        assert_eq!(summary.simple_count, 2);
        assert_eq!(summary.delta_count, 0);
        assert_eq!(
            summary.latest.timestamp,
            Utc.with_ymd_and_hms(2021, 1, 2, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn groups_delta_backups() {
        let listing = entries(&["vm_delta_nightly_uuid123/20210105T000000Z_vm2"]);

        let catalog = build("remote-1", &listing);

        let summary = &catalog["vm2"];
        assert_eq!(summary.delta_count, 1);
        assert_eq!(summary.simple_count, 0);
        assert_eq!(summary.latest.kind, BackupKind::Delta);
        assert_eq!(summary.latest.tag, "nightly");
    }

    #[test]
    fn foreign_entries_produce_no_groups() {
        let listing = entries(&["not_a_backup_file.txt"]);
        let catalog = build("remote-1", &listing);
        assert!(catalog.is_empty());
    }

    #[test]
    fn foreign_entries_do_not_alter_counts() {
        let listing = entries(&[
            "20210101T120000Z_weekly_vm1.xva",
            ".DS_Store",
            "vm_delta_nightly_abc/20210103T000000Z_vm1",
            "random_notes.md",
        ]);

        let catalog = build("remote-1", &listing);

        let summary = &catalog["vm1"];
        assert_eq!(summary.simple_count, 1);
        assert_eq!(summary.delta_count, 1);
        assert_eq!(summary.simple_count + summary.delta_count, 2);
    }

    #[test]
    fn latest_dominates_every_group_member() {
        let listing = entries(&[
            "20210103T000000Z_daily_vm1.xva",
            "20210101T000000Z_daily_vm1.xva",
            "20210102T000000Z_daily_vm1.xva",
        ]);

        let catalog = build("remote-1", &listing);
        let summary = &catalog["vm1"];
        assert_eq!(
            summary.latest.timestamp,
            Utc.with_ymd_and_hms(2021, 1, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn first_seen_wins_timestamp_tie() {
        let listing = entries(&[
            "20210101T000000Z_daily_vm1.xva",
            "vm_delta_daily_abc/20210101T000000Z_vm1",
        ]);

        let catalog = build("remote-1", &listing);
        let summary = &catalog["vm1"];
        assert_eq!(summary.latest.kind, BackupKind::Simple);
        assert_eq!(summary.latest.path, "20210101T000000Z_daily_vm1.xva");
    }

    #[test]
    fn machines_are_grouped_independently() {
        let listing = entries(&[
            "20210101T000000Z_daily_vm1.xva",
            "20210102T000000Z_daily_vm2.xva",
            "vm_delta_nightly_abc/20210103T000000Z_vm2",
        ]);

        let catalog = build("remote-1", &listing);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog["vm1"].simple_count, 1);
        assert_eq!(catalog["vm2"].simple_count, 1);
        assert_eq!(catalog["vm2"].delta_count, 1);
    }

    #[test]
    fn empty_listing_builds_empty_catalog() {
        let catalog = build("remote-1", &[]);
        assert!(catalog.is_empty());
    }

    #[test]
    fn backups_for_machine_filters_by_name() {
        let listing = entries(&[
            "20210101T000000Z_daily_vm1.xva",
            "20210102T000000Z_daily_vm2.xva",
            "vm_delta_nightly_abc/20210103T000000Z_vm1",
            "junk.txt",
        ]);

        let backups = backups_for_machine("remote-1", &listing, "vm1");

        assert_eq!(backups.len(), 2);
        assert!(backups.iter().all(|b| b.machine_name == "vm1"));
        // Listing order is preserved.
        assert_eq!(backups[0].kind, BackupKind::Simple);
        assert_eq!(backups[1].kind, BackupKind::Delta);
    }
}
