use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use vmrestored::adapters::{SimulatedPlatform, SimulatorController};
use vmrestored::config::AppConfig;
use vmrestored::context::AppContext;
use vmrestored::core::notifications::{NotificationChannel, RestoreEvent};
use vmrestored::core::platform::VmPlatform;
use vmrestored::core::{Command, Orchestrator, PlatformEvent};

/// Captures delivered events so tests can assert what the refresh path
/// emitted.
#[derive(Clone, Default)]
struct RecordingChannel {
    events: Arc<Mutex<Vec<RestoreEvent>>>,
}

impl RecordingChannel {
    fn events(&self) -> Vec<RestoreEvent> {
        self.events.lock().unwrap().clone()
    }

    async fn wait_for(&self, count: usize) -> Vec<RestoreEvent> {
        for _ in 0..100 {
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.events()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn notify(&self, event: RestoreEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

fn setup() -> (
    Arc<SimulatedPlatform>,
    SimulatorController,
    Orchestrator,
    mpsc::Receiver<PlatformEvent>,
) {
    let (platform, controller) = SimulatedPlatform::new();
    let platform = Arc::new(platform);
    let ctx = AppContext::new(AppConfig::default());
    let orchestrator = Orchestrator::new(&ctx, platform.clone());

    let (tx, rx) = mpsc::channel(32);
    platform.subscribe_remotes(tx);

    (platform, controller, orchestrator, rx)
}

fn drain_events(orchestrator: &mut Orchestrator, rx: &mut mpsc::Receiver<PlatformEvent>) {
    while let Ok(event) = rx.try_recv() {
        orchestrator.handle_platform_event(event);
    }
}

#[tokio::test]
async fn registry_updates_populate_cache() {
    let (_platform, controller, mut orchestrator, mut rx) = setup();

    controller.add_remote("nfs-1", "NFS One");
    controller.add_remote("smb-1", "Archive share");
    drain_events(&mut orchestrator, &mut rx);

    let remotes = orchestrator.cache().remotes();
    assert_eq!(remotes.len(), 2);
    // Ordered by name.
    assert_eq!(remotes[0].id, "smb-1");
    assert_eq!(remotes[1].id, "nfs-1");
}

#[tokio::test]
async fn refresh_builds_catalog_from_listing() {
    let (_platform, controller, mut orchestrator, mut rx) = setup();

    controller.add_remote("nfs-1", "NFS One");
    controller.seed_listing(
        "nfs-1",
        &[
            "20210101T120000Z_weekly_vm1.xva",
            "20210102T120000Z_weekly_vm1.xva",
            "vm_delta_nightly_uuid123/20210105T000000Z_vm2",
            "not_a_backup_file.txt",
        ],
    );
    drain_events(&mut orchestrator, &mut rx);

    orchestrator
        .handle_command(Command::RefreshCatalog {
            remote_id: "nfs-1".to_string(),
        })
        .await;

    let catalog = orchestrator.cache().catalog("nfs-1").expect("catalog fetched");
    assert_eq!(catalog.len(), 2);

    let vm1 = &catalog["vm1"];
    assert_eq!(vm1.simple_count, 2);
    assert_eq!(vm1.delta_count, 0);
    assert_eq!(vm1.latest.path, "20210102T120000Z_weekly_vm1.xva");

    let vm2 = &catalog["vm2"];
    assert_eq!(vm2.delta_count, 1);
    assert_eq!(vm2.latest.tag, "nightly");
}

#[tokio::test]
async fn empty_listing_yields_empty_catalog() {
    let (_platform, controller, mut orchestrator, mut rx) = setup();

    controller.add_remote("nfs-1", "NFS One");
    drain_events(&mut orchestrator, &mut rx);

    orchestrator.refresh_catalog("nfs-1").await;

    // Fetched and empty, not "never fetched".
    let catalog = orchestrator.cache().catalog("nfs-1").expect("catalog stored");
    assert!(catalog.is_empty());
    assert!(orchestrator.cache().is_empty_remote("nfs-1"));
}

#[tokio::test]
async fn fetch_failure_keeps_cached_catalog() {
    let (_platform, controller, mut orchestrator, mut rx) = setup();

    controller.add_remote("nfs-1", "NFS One");
    controller.seed_listing("nfs-1", &["20210101T120000Z_weekly_vm1.xva"]);
    drain_events(&mut orchestrator, &mut rx);

    orchestrator.refresh_catalog("nfs-1").await;
    assert!(orchestrator.cache().catalog("nfs-1").is_some());

    controller.set_listing_failure("nfs-1", true);
    orchestrator.refresh_catalog("nfs-1").await;

    // Stale-but-available beats empty.
    let catalog = orchestrator.cache().catalog("nfs-1").expect("catalog kept");
    assert!(catalog.contains_key("vm1"));
}

#[tokio::test]
async fn listing_failure_emits_refresh_failed_notification() {
    let (platform, controller) = SimulatedPlatform::new();
    let platform = Arc::new(platform);
    let channel = RecordingChannel::default();
    let ctx = AppContext {
        config: Arc::new(AppConfig::default()),
        notifier: Some(Arc::new(channel.clone())),
    };
    let mut orchestrator = Orchestrator::new(&ctx, platform.clone());

    controller.add_remote("nfs-1", "NFS One");
    controller.seed_listing("nfs-1", &["20210101T120000Z_weekly_vm1.xva"]);
    let (tx, mut rx) = mpsc::channel(8);
    platform.subscribe_remotes(tx);
    drain_events(&mut orchestrator, &mut rx);

    orchestrator.refresh_catalog("nfs-1").await;

    controller.set_listing_failure("nfs-1", true);
    orchestrator.refresh_catalog("nfs-1").await;

    let events = channel.wait_for(1).await;
    // The successful refresh emitted nothing; the failed one emitted
    // exactly one event.
    assert_eq!(events.len(), 1);
    match &events[0] {
        RestoreEvent::RefreshFailed { remote_id, error } => {
            assert_eq!(remote_id, "nfs-1");
            assert!(error.contains("simulated transport failure"));
        }
        other => panic!("expected RefreshFailed, got {other:?}"),
    }

    // The cached catalog survived the failure.
    let catalog = orchestrator.cache().catalog("nfs-1").expect("catalog kept");
    assert!(catalog.contains_key("vm1"));
}

#[tokio::test]
async fn registry_update_preserves_fetched_catalogs() {
    let (_platform, controller, mut orchestrator, mut rx) = setup();

    controller.add_remote("nfs-1", "NFS One");
    controller.seed_listing("nfs-1", &["20210101T120000Z_weekly_vm1.xva"]);
    drain_events(&mut orchestrator, &mut rx);
    orchestrator.refresh_catalog("nfs-1").await;

    // A second remote appearing must not discard nfs-1's catalog.
    controller.add_remote("smb-1", "Archive share");
    drain_events(&mut orchestrator, &mut rx);

    assert_eq!(orchestrator.cache().remotes().len(), 2);
    let catalog = orchestrator.cache().catalog("nfs-1").expect("catalog kept");
    assert!(catalog.contains_key("vm1"));
}

#[tokio::test]
async fn refresh_for_unknown_remote_is_dropped() {
    let (_platform, controller, mut orchestrator, mut rx) = setup();

    controller.seed_listing("ghost", &["20210101T120000Z_weekly_vm1.xva"]);
    drain_events(&mut orchestrator, &mut rx);

    orchestrator.refresh_catalog("ghost").await;

    assert!(orchestrator.cache().catalog("ghost").is_none());
}

#[tokio::test]
async fn removed_remote_loses_its_catalog() {
    let (_platform, controller, mut orchestrator, mut rx) = setup();

    controller.add_remote("nfs-1", "NFS One");
    controller.seed_listing("nfs-1", &["20210101T120000Z_weekly_vm1.xva"]);
    drain_events(&mut orchestrator, &mut rx);
    orchestrator.refresh_catalog("nfs-1").await;

    controller.remove_remote("nfs-1");
    drain_events(&mut orchestrator, &mut rx);

    assert!(orchestrator.cache().remote("nfs-1").is_none());
    assert!(orchestrator.cache().catalog("nfs-1").is_none());
}
