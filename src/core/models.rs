use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a backup artifact was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    /// Self-contained full backup stored as a single .xva file.
    Simple,
    /// Incremental backup stored under a vm_delta_* directory.
    Delta,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

/// One discovered backup artifact on a remote store.
///
/// Every field is derived deterministically from the listing entry string;
/// entries matching neither grammar produce no record at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub kind: BackupKind,
    pub timestamp: DateTime<Utc>,
    /// Source virtual machine name; the grouping key.
    pub machine_name: String,
    /// Job/schedule label attached at backup-creation time.
    pub tag: String,
    /// Opaque locator, exactly as returned by the remote listing.
    /// Passed back unmodified to the import operation.
    pub path: String,
    pub remote_id: String,
}

/// Aggregate over all records sharing a machine name within one remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineBackupSummary {
    /// Record with the greatest timestamp; first-seen wins on ties.
    pub latest: BackupRecord,
    pub simple_count: usize,
    pub delta_count: usize,
}

/// Per-remote catalog: machine name to summary. Empty means "no backups
/// on this remote", which is distinct from "listing failed".
pub type RemoteCatalog = BTreeMap<String, MachineBackupSummary>;

/// Remote-store metadata as pushed by the platform registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteInfo {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// A storage target within the virtualization platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub writable: bool,
}

/// One restore action. Constructed per user request and consumed once.
///
/// Both `backup` and `destination` are optional on purpose: the dispatcher
/// validates their presence before any side effect and rejects the request
/// without touching the platform when either is missing.
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    pub backup: Option<BackupRecord>,
    pub destination: Option<Destination>,
    pub start_after_import: bool,
}
