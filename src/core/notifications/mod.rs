mod slack;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::{NotificationChannelType, NotificationConfig};

/// Events that trigger notifications
#[derive(Debug, Clone)]
pub enum RestoreEvent {
    Started {
        job_id: String,
        machine_name: String,
        remote_id: String,
        destination: String,
    },
    Completed {
        job_id: String,
        machine_name: String,
        machine_id: String,
        booted: bool,
    },
    Failed {
        job_id: String,
        machine_name: String,
        /// Which stage failed: "import" or "boot".
        stage: &'static str,
        error: String,
    },
    /// Listing a remote's entries failed; its cached catalog was kept.
    RefreshFailed {
        remote_id: String,
        error: String,
    },
}

/// Trait for notification channel implementations (Slack, Discord, etc.)
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn notify(&self, event: RestoreEvent) -> Result<()>;
}

/// Deliver an event on a background task. Delivery never blocks or
/// fails the operation that triggered it.
pub fn send_background(notifier: Option<&Arc<dyn NotificationChannel>>, event: RestoreEvent) {
    if let Some(notifier) = notifier {
        let notifier = notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(event).await {
                debug!(error = %e, "Notification delivery failed");
            }
        });
    }
}

/// Factory function to create a notifier based on config
pub fn create_notifier(config: &NotificationConfig) -> Option<Arc<dyn NotificationChannel>> {
    match &config.channel {
        NotificationChannelType::None => None,
        NotificationChannelType::Slack => {
            let webhook = config.slack_webhook.as_ref()?;
            if webhook.is_empty() {
                return None;
            }
            Some(Arc::new(slack::SlackNotifier::new(webhook.clone())))
        }
    }
}
