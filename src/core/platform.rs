use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::models::{Destination, RemoteInfo};

/// Push notifications from the platform's remote registry.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    RemotesUpdated(Vec<RemoteInfo>),
}

/// Parameters for one import invocation, regardless of backup kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRequest {
    pub remote_id: String,
    pub destination_id: String,
    /// Listing entry exactly as returned by the remote, untouched.
    pub file: String,
}

/// Read access to a remote file store's backup listing.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List all entries on a remote. May fail with a transport error;
    /// the caller decides what to do with previously cached data.
    async fn list_remote_entries(&self, remote_id: &str) -> anyhow::Result<Vec<String>>;
}

/// The virtualization platform's import/boot surface.
///
/// Implementations are thin clients; timeouts and retries, if any, are
/// their concern, not the dispatcher's.
#[async_trait]
pub trait VmPlatform: RemoteStore {
    /// Start listening for remote-registry updates.
    /// Spawns internal tasks that send events to the provided channel.
    fn subscribe_remotes(&self, events: mpsc::Sender<PlatformEvent>);

    /// Import a self-contained .xva backup. Returns the new machine's id.
    async fn import_simple(&self, req: ImportRequest) -> anyhow::Result<String>;

    /// Import a delta backup chain. Returns the new machine's id.
    async fn import_delta(&self, req: ImportRequest) -> anyhow::Result<String>;

    /// Boot a machine by id.
    async fn boot_machine(&self, machine_id: &str) -> anyhow::Result<()>;

    /// Storage targets a restore may be imported into, already filtered
    /// to writable-capable ones.
    async fn list_writable_destinations(&self) -> anyhow::Result<Vec<Destination>>;
}
