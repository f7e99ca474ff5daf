mod http;
mod simulated;

pub use http::HttpPlatform;
pub use simulated::{SimulatedPlatform, SimulatorController};

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::core::orchestrator::Command;
use crate::core::platform::VmPlatform;

/// Pick the platform implementation. In simulation mode a stdin console
/// drives the controller and the command channel.
pub fn get_platform(config: &AppConfig, commands: mpsc::Sender<Command>) -> Arc<dyn VmPlatform> {
    if config.simulation {
        let (platform, controller) = SimulatedPlatform::new();
        spawn_console(controller, commands);
        return Arc::new(platform);
    }

    Arc::new(HttpPlatform::new(config))
}

fn spawn_console(controller: SimulatorController, commands: mpsc::Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lines() {
            let Ok(line) = line else { break };
            let parts: Vec<&str> = line.trim().split_whitespace().collect();
            match parts.as_slice() {
                ["remote", "add", id] => controller.add_remote(id, id),
                ["remote", "add", id, name] => controller.add_remote(id, name),
                ["remote", "rm", id] => controller.remove_remote(id),
                ["file", remote_id, entry] => controller.seed_listing(remote_id, &[entry]),
                ["dest", "add", id] => controller.add_destination(id, id, true),
                ["dest", "add", id, name] => controller.add_destination(id, name, true),
                ["refresh", remote_id] => {
                    let _ = commands.blocking_send(Command::RefreshCatalog {
                        remote_id: remote_id.to_string(),
                    });
                }
                ["restore", remote_id, machine, dest, rest @ ..] => {
                    let _ = commands.blocking_send(Command::RestoreLatest {
                        remote_id: remote_id.to_string(),
                        machine_name: machine.to_string(),
                        destination_id: dest.to_string(),
                        start_after_import: rest == ["--start"],
                    });
                }
                _ => println!(
                    "(Simulator) Use: 'remote add <id> [name]' | 'remote rm <id>' | \
                     'file <remote> <entry>' | 'dest add <id> [name]' | 'refresh <remote>' | \
                     'restore <remote> <machine> <dest> [--start]'"
                ),
            }
        }
    });
}
