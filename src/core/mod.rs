pub mod cache;
pub mod catalog;
pub mod dispatcher;
pub mod models;
pub mod notifications;
pub mod orchestrator;
pub mod parser;
pub mod platform;

pub use cache::CatalogCache;
pub use dispatcher::{RestoreDispatcher, RestoreError, RestoreOutcome};
pub use models::{
    BackupKind, BackupRecord, Destination, MachineBackupSummary, RemoteCatalog, RemoteInfo,
    RestoreRequest,
};
pub use orchestrator::{Command, Orchestrator};
pub use platform::{ImportRequest, PlatformEvent, RemoteStore, VmPlatform};
