use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::AppConfig;
use crate::core::models::{Destination, RemoteInfo};
use crate::core::platform::{ImportRequest, PlatformEvent, RemoteStore, VmPlatform};

/// Thin JSON client for the platform's HTTP API. Timeouts and retries
/// are the platform's concern; this client performs one call per request.
pub struct HttpPlatform {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
}

#[derive(Serialize)]
struct ImportBody<'a> {
    remote: &'a str,
    destination: &'a str,
    file: &'a str,
}

#[derive(Deserialize)]
struct ImportReply {
    machine_id: String,
}

impl HttpPlatform {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.platform_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(config.registry_poll_secs),
        }
    }

    async fn import(&self, endpoint: &str, req: &ImportRequest) -> Result<String> {
        let url = format!("{}/import/{}", self.base_url, endpoint);
        let body = ImportBody {
            remote: &req.remote_id,
            destination: &req.destination_id,
            file: &req.file,
        };

        let reply: ImportReply = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Malformed import reply")?;

        Ok(reply.machine_id)
    }
}

async fn fetch_remotes(client: &reqwest::Client, base_url: &str) -> Result<Vec<RemoteInfo>> {
    let url = format!("{base_url}/remotes");
    let remotes = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(remotes)
}

#[async_trait]
impl RemoteStore for HttpPlatform {
    async fn list_remote_entries(&self, remote_id: &str) -> Result<Vec<String>> {
        let url = format!("{}/remotes/{}/files", self.base_url, remote_id);
        let entries = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Malformed remote listing")?;
        Ok(entries)
    }
}

#[async_trait]
impl VmPlatform for HttpPlatform {
    fn subscribe_remotes(&self, events: mpsc::Sender<PlatformEvent>) {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            loop {
                match fetch_remotes(&client, &base_url).await {
                    Ok(remotes) => {
                        if events
                            .send(PlatformEvent::RemotesUpdated(remotes))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Fetching remote registry failed"),
                }
                tokio::time::sleep(poll_interval).await;
            }
        });
    }

    async fn import_simple(&self, req: ImportRequest) -> Result<String> {
        self.import("simple", &req).await
    }

    async fn import_delta(&self, req: ImportRequest) -> Result<String> {
        self.import("delta", &req).await
    }

    async fn boot_machine(&self, machine_id: &str) -> Result<()> {
        let url = format!("{}/machines/{}/boot", self.base_url, machine_id);
        self.client
            .post(&url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn list_writable_destinations(&self) -> Result<Vec<Destination>> {
        let url = format!("{}/destinations", self.base_url);
        let destinations: Vec<Destination> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Malformed destination list")?;

        Ok(destinations.into_iter().filter(|d| d.writable).collect())
    }
}
