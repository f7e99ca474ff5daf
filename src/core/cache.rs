//! In-memory catalog cache for the interactive session.
//!
//! The cache is owned by the orchestrator's control loop and mutated only
//! there, so it needs no locking. It is rebuilt from scratch every session;
//! nothing here is persisted.

use crate::core::models::{RemoteCatalog, RemoteInfo};
use std::collections::HashMap;

/// Session-scoped view of all known remotes and their fetched catalogs.
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    remotes: Vec<RemoteInfo>,
    catalogs: HashMap<String, RemoteCatalog>,
}

/// Fold a fresh remote list into an existing cache.
///
/// The remote set is replaced wholesale (sorted by name), but catalogs
/// already fetched for remotes that reappear in the new list are carried
/// over: a registry update (say, an enabled flag toggling) must not throw
/// away backup data the user already waited for. Catalogs for remotes
/// that vanished from the registry are dropped with them.
pub fn merge(old: CatalogCache, mut remotes: Vec<RemoteInfo>) -> CatalogCache {
    remotes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut catalogs = old.catalogs;
    catalogs.retain(|id, _| remotes.iter().any(|r| &r.id == id));

    CatalogCache { remotes, catalogs }
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known remote set, preserving catalogs for remotes that
    /// are still present. Never invalidates a catalog on metadata change.
    pub fn upsert_remote_list(&mut self, remotes: Vec<RemoteInfo>) {
        let old = std::mem::take(self);
        *self = merge(old, remotes);
    }

    /// Replace the catalog for exactly one remote. Returns false (and
    /// stores nothing) when the remote is no longer known; a listing that
    /// raced with the remote's removal must not resurrect it.
    pub fn refresh_catalog(&mut self, remote_id: &str, catalog: RemoteCatalog) -> bool {
        if !self.remotes.iter().any(|r| r.id == remote_id) {
            return false;
        }
        self.catalogs.insert(remote_id.to_string(), catalog);
        true
    }

    /// Known remotes, ordered by name.
    pub fn remotes(&self) -> &[RemoteInfo] {
        &self.remotes
    }

    pub fn remote(&self, remote_id: &str) -> Option<&RemoteInfo> {
        self.remotes.iter().find(|r| r.id == remote_id)
    }

    /// The fetched catalog for a remote. `None` means never fetched this
    /// session; an empty map means fetched and no backups found.
    pub fn catalog(&self, remote_id: &str) -> Option<&RemoteCatalog> {
        self.catalogs.get(remote_id)
    }

    /// True when a remote has nothing to show: either never fetched or
    /// fetched with no backups.
    pub fn is_empty_remote(&self, remote_id: &str) -> bool {
        self.catalog(remote_id).is_none_or(|c| c.is_empty())
    }
}
