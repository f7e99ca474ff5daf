use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::models::{BackupKind, Destination, RemoteInfo};
use crate::core::platform::{ImportRequest, PlatformEvent, RemoteStore, VmPlatform};

#[derive(Default)]
struct State {
    remotes: Vec<RemoteInfo>,
    listings: HashMap<String, Vec<String>>,
    destinations: Vec<Destination>,
    failing_remotes: HashSet<String>,
    fail_imports: bool,
    fail_boots: bool,
    /// Machine ids handed out before falling back to generated ones.
    forced_machine_ids: Vec<String>,
    machines_created: u64,
    import_calls: Vec<(BackupKind, ImportRequest)>,
    boot_calls: Vec<String>,
}

struct Inner {
    state: Mutex<State>,
    subscribers: Mutex<Vec<mpsc::Sender<PlatformEvent>>>,
}

/// In-memory platform used by `--simulation` mode and the integration
/// tests. Behavior is driven through the paired [`SimulatorController`].
pub struct SimulatedPlatform {
    inner: Arc<Inner>,
}

/// Handle for injecting remotes, listings, and failures into a
/// [`SimulatedPlatform`], and for inspecting the calls it received.
#[derive(Clone)]
pub struct SimulatorController {
    inner: Arc<Inner>,
}

impl SimulatedPlatform {
    pub fn new() -> (Self, SimulatorController) {
        let inner = Arc::new(Inner {
            state: Mutex::new(State::default()),
            subscribers: Mutex::new(Vec::new()),
        });
        (
            Self {
                inner: inner.clone(),
            },
            SimulatorController { inner },
        )
    }
}

impl Inner {
    fn broadcast_remotes(&self) {
        let snapshot = self.state.lock().unwrap().remotes.clone();
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers
            .retain(|tx| tx.try_send(PlatformEvent::RemotesUpdated(snapshot.clone())).is_ok());
    }
}

impl SimulatorController {
    pub fn add_remote(&self, id: &str, name: &str) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.remotes.retain(|r| r.id != id);
            state.remotes.push(RemoteInfo {
                id: id.to_string(),
                name: name.to_string(),
                enabled: true,
                error: None,
            });
        }
        self.inner.broadcast_remotes();
    }

    pub fn remove_remote(&self, id: &str) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.remotes.retain(|r| r.id != id);
        }
        self.inner.broadcast_remotes();
    }

    pub fn seed_listing(&self, remote_id: &str, entries: &[&str]) {
        let mut state = self.inner.state.lock().unwrap();
        state
            .listings
            .entry(remote_id.to_string())
            .or_default()
            .extend(entries.iter().map(|e| e.to_string()));
    }

    pub fn add_destination(&self, id: &str, name: &str, writable: bool) {
        let mut state = self.inner.state.lock().unwrap();
        state.destinations.push(Destination {
            id: id.to_string(),
            name: name.to_string(),
            writable,
        });
    }

    /// Make listings for one remote fail with a transport error.
    pub fn set_listing_failure(&self, remote_id: &str, failing: bool) {
        let mut state = self.inner.state.lock().unwrap();
        if failing {
            state.failing_remotes.insert(remote_id.to_string());
        } else {
            state.failing_remotes.remove(remote_id);
        }
    }

    pub fn fail_imports(&self, failing: bool) {
        self.inner.state.lock().unwrap().fail_imports = failing;
    }

    pub fn fail_boots(&self, failing: bool) {
        self.inner.state.lock().unwrap().fail_boots = failing;
    }

    /// Queue the id the next import will return.
    pub fn set_next_machine_id(&self, machine_id: &str) {
        self.inner
            .state
            .lock()
            .unwrap()
            .forced_machine_ids
            .push(machine_id.to_string());
    }

    pub fn import_calls(&self) -> Vec<(BackupKind, ImportRequest)> {
        self.inner.state.lock().unwrap().import_calls.clone()
    }

    pub fn boot_calls(&self) -> Vec<String> {
        self.inner.state.lock().unwrap().boot_calls.clone()
    }
}

impl SimulatedPlatform {
    fn import(&self, kind: BackupKind, req: ImportRequest) -> Result<String> {
        let mut state = self.inner.state.lock().unwrap();
        state.import_calls.push((kind, req));

        if state.fail_imports {
            bail!("simulated import failure");
        }

        if state.forced_machine_ids.is_empty() {
            state.machines_created += 1;
            Ok(format!("vm-{}", state.machines_created))
        } else {
            Ok(state.forced_machine_ids.remove(0))
        }
    }
}

#[async_trait]
impl RemoteStore for SimulatedPlatform {
    async fn list_remote_entries(&self, remote_id: &str) -> Result<Vec<String>> {
        let state = self.inner.state.lock().unwrap();
        if state.failing_remotes.contains(remote_id) {
            bail!("simulated transport failure listing remote {remote_id}");
        }
        Ok(state.listings.get(remote_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl VmPlatform for SimulatedPlatform {
    fn subscribe_remotes(&self, events: mpsc::Sender<PlatformEvent>) {
        let snapshot = self.inner.state.lock().unwrap().remotes.clone();
        // New subscribers see the current registry right away.
        let _ = events.try_send(PlatformEvent::RemotesUpdated(snapshot));
        self.inner.subscribers.lock().unwrap().push(events);
    }

    async fn import_simple(&self, req: ImportRequest) -> Result<String> {
        self.import(BackupKind::Simple, req)
    }

    async fn import_delta(&self, req: ImportRequest) -> Result<String> {
        self.import(BackupKind::Delta, req)
    }

    async fn boot_machine(&self, machine_id: &str) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap();
        state.boot_calls.push(machine_id.to_string());
        if state.fail_boots {
            bail!("simulated boot failure for {machine_id}");
        }
        Ok(())
    }

    async fn list_writable_destinations(&self) -> Result<Vec<Destination>> {
        let state = self.inner.state.lock().unwrap();
        Ok(state
            .destinations
            .iter()
            .filter(|d| d.writable)
            .cloned()
            .collect())
    }
}
