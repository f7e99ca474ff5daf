//! Restore dispatcher: validates a restore request, invokes the import
//! operation matching the backup kind, and optionally chains one boot.
//!
//! Exactly one import attempt and at most one boot attempt per request.
//! A successful import is never rolled back when the boot fails.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::models::{BackupKind, BackupRecord, Destination, RestoreRequest};
use crate::core::notifications::{self, NotificationChannel, RestoreEvent};
use crate::core::platform::{ImportRequest, VmPlatform};

/// Pre-flight rejection: the request never reaches the platform.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RestoreError {
    #[error("no destination selected")]
    MissingDestination,
    #[error("no backup selected")]
    MissingBackup,
    #[error("destination '{name}' is not writable")]
    DestinationNotWritable { name: String },
}

/// Terminal state of a dispatched restore.
///
/// Import and boot failures are reported to the user the same way, but
/// they are distinct stages; a tagged outcome lets callers and tests
/// assert each branch directly.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    ImportFailed {
        error: String,
    },
    Imported {
        machine_id: String,
    },
    ImportedAndBooted {
        machine_id: String,
    },
    ImportedBootFailed {
        machine_id: String,
        error: String,
    },
}

pub struct RestoreDispatcher {
    platform: Arc<dyn VmPlatform>,
    notifier: Option<Arc<dyn NotificationChannel>>,
}

impl RestoreDispatcher {
    pub fn new(
        platform: Arc<dyn VmPlatform>,
        notifier: Option<Arc<dyn NotificationChannel>>,
    ) -> Self {
        Self { platform, notifier }
    }

    /// Run one restore to completion or failure. No retries, no rollback.
    pub async fn restore(&self, req: RestoreRequest) -> Result<RestoreOutcome, RestoreError> {
        let (backup, destination) = validate(req.backup, req.destination)?;

        let job_id = Uuid::now_v7().to_string();
        info!(
            job_id = %job_id,
            machine = %backup.machine_name,
            kind = %backup.kind,
            remote_id = %backup.remote_id,
            destination = %destination.name,
            "Restore started"
        );
        self.notify(RestoreEvent::Started {
            job_id: job_id.clone(),
            machine_name: backup.machine_name.clone(),
            remote_id: backup.remote_id.clone(),
            destination: destination.name.clone(),
        });

        let import = ImportRequest {
            remote_id: backup.remote_id.clone(),
            destination_id: destination.id.clone(),
            file: backup.path.clone(),
        };

        let machine_id = match self.import(backup.kind, import).await {
            Ok(machine_id) => machine_id,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Import failed");
                self.notify(RestoreEvent::Failed {
                    job_id,
                    machine_name: backup.machine_name,
                    stage: "import",
                    error: e.to_string(),
                });
                return Ok(RestoreOutcome::ImportFailed {
                    error: e.to_string(),
                });
            }
        };

        info!(job_id = %job_id, machine_id = %machine_id, "Import complete");

        if !req.start_after_import {
            self.notify(RestoreEvent::Completed {
                job_id,
                machine_name: backup.machine_name,
                machine_id: machine_id.clone(),
                booted: false,
            });
            return Ok(RestoreOutcome::Imported { machine_id });
        }

        match self.platform.boot_machine(&machine_id).await {
            Ok(()) => {
                info!(job_id = %job_id, machine_id = %machine_id, "Machine booted");
                self.notify(RestoreEvent::Completed {
                    job_id,
                    machine_name: backup.machine_name,
                    machine_id: machine_id.clone(),
                    booted: true,
                });
                Ok(RestoreOutcome::ImportedAndBooted { machine_id })
            }
            Err(e) => {
                // The imported machine stays; only the boot is reported.
                warn!(job_id = %job_id, machine_id = %machine_id, error = %e, "Boot failed");
                self.notify(RestoreEvent::Failed {
                    job_id,
                    machine_name: backup.machine_name,
                    stage: "boot",
                    error: e.to_string(),
                });
                Ok(RestoreOutcome::ImportedBootFailed {
                    machine_id,
                    error: e.to_string(),
                })
            }
        }
    }

    async fn import(&self, kind: BackupKind, req: ImportRequest) -> anyhow::Result<String> {
        match kind {
            BackupKind::Simple => self.platform.import_simple(req).await,
            BackupKind::Delta => self.platform.import_delta(req).await,
        }
    }

    /// Fire-and-forget: notification delivery never blocks or fails a
    /// restore.
    fn notify(&self, event: RestoreEvent) {
        notifications::send_background(self.notifier.as_ref(), event);
    }
}

fn validate(
    backup: Option<BackupRecord>,
    destination: Option<Destination>,
) -> Result<(BackupRecord, Destination), RestoreError> {
    let destination = destination.ok_or(RestoreError::MissingDestination)?;
    let backup = backup.ok_or(RestoreError::MissingBackup)?;
    if !destination.writable {
        return Err(RestoreError::DestinationNotWritable {
            name: destination.name,
        });
    }
    Ok((backup, destination))
}
