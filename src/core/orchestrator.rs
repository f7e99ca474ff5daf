use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::context::AppContext;
use crate::core::cache::CatalogCache;
use crate::core::catalog;
use crate::core::dispatcher::{RestoreDispatcher, RestoreOutcome};
use crate::core::models::RestoreRequest;
use crate::core::notifications::{self, NotificationChannel, RestoreEvent};
use crate::core::platform::{PlatformEvent, VmPlatform};

/// User-driven actions fed into the control loop.
#[derive(Debug)]
pub enum Command {
    /// Re-list one remote and rebuild its catalog. Never automatic.
    RefreshCatalog { remote_id: String },
    /// Restore the latest backup of a machine into a destination.
    RestoreLatest {
        remote_id: String,
        machine_name: String,
        destination_id: String,
        start_after_import: bool,
    },
}

/// The single control thread. Owns the catalog cache; all mutation
/// happens here, so the cache needs no locking.
pub struct Orchestrator {
    platform: Arc<dyn VmPlatform>,
    dispatcher: RestoreDispatcher,
    notifier: Option<Arc<dyn NotificationChannel>>,
    cache: CatalogCache,
}

impl Orchestrator {
    pub fn new(ctx: &AppContext, platform: Arc<dyn VmPlatform>) -> Self {
        let dispatcher = RestoreDispatcher::new(platform.clone(), ctx.notifier.clone());
        Self {
            platform,
            dispatcher,
            notifier: ctx.notifier.clone(),
            cache: CatalogCache::new(),
        }
    }

    pub async fn start(&mut self, mut commands: mpsc::Receiver<Command>) -> Result<()> {
        info!("Catalog and restore loop starting");

        let (tx, mut events) = mpsc::channel(32);
        self.platform.subscribe_remotes(tx);

        loop {
            tokio::select! {
                Some(event) = events.recv() => self.handle_platform_event(event),
                Some(command) = commands.recv() => self.handle_command(command).await,
                else => break,
            }
        }

        Ok(())
    }

    pub fn handle_platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::RemotesUpdated(remotes) => {
                debug!(count = remotes.len(), "Remote registry updated");
                self.cache.upsert_remote_list(remotes);
            }
        }
    }

    pub async fn handle_command(&mut self, command: Command) {
        match command {
            Command::RefreshCatalog { remote_id } => self.refresh_catalog(&remote_id).await,
            Command::RestoreLatest {
                remote_id,
                machine_name,
                destination_id,
                start_after_import,
            } => {
                self.restore_latest(&remote_id, &machine_name, &destination_id, start_after_import)
                    .await
            }
        }
    }

    /// List a remote and replace its catalog. A failed listing leaves the
    /// previously cached catalog untouched: stale-but-available beats empty.
    pub async fn refresh_catalog(&mut self, remote_id: &str) {
        let entries = match self.platform.list_remote_entries(remote_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(remote_id, error = %e, "Listing remote failed, keeping cached catalog");
                notifications::send_background(
                    self.notifier.as_ref(),
                    RestoreEvent::RefreshFailed {
                        remote_id: remote_id.to_string(),
                        error: e.to_string(),
                    },
                );
                return;
            }
        };

        let built = catalog::build(remote_id, &entries);
        let machines = built.len();
        if self.cache.refresh_catalog(remote_id, built) {
            info!(remote_id, machines, "Catalog refreshed");
        } else {
            warn!(remote_id, "Refresh for unknown remote dropped");
        }
    }

    /// Resolve the machine's latest backup and the destination, then hand
    /// off to the dispatcher. Missing lookups flow into the dispatcher's
    /// validation, which rejects before any platform call.
    pub async fn restore_latest(
        &self,
        remote_id: &str,
        machine_name: &str,
        destination_id: &str,
        start_after_import: bool,
    ) {
        let backup = self
            .cache
            .catalog(remote_id)
            .and_then(|c| c.get(machine_name))
            .map(|summary| summary.latest.clone());

        let destination = match self.platform.list_writable_destinations().await {
            Ok(destinations) => destinations.into_iter().find(|d| d.id == destination_id),
            Err(e) => {
                warn!(error = %e, "Listing destinations failed");
                None
            }
        };

        let request = RestoreRequest {
            backup,
            destination,
            start_after_import,
        };

        match self.dispatcher.restore(request).await {
            Ok(RestoreOutcome::ImportedAndBooted { machine_id }) => {
                info!(machine_id = %machine_id, "Restore finished, machine running");
            }
            Ok(RestoreOutcome::Imported { machine_id }) => {
                info!(machine_id = %machine_id, "Restore finished");
            }
            Ok(RestoreOutcome::ImportedBootFailed { machine_id, error }) => {
                warn!(machine_id = %machine_id, error = %error, "Restore imported but machine failed to boot");
            }
            Ok(RestoreOutcome::ImportFailed { error }) => {
                warn!(error = %error, "Restore import failed");
            }
            Err(e) => warn!(error = %e, "Restore rejected"),
        }
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }
}
