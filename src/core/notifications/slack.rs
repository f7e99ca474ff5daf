use super::{NotificationChannel, RestoreEvent};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    fn format_message(&self, event: &RestoreEvent) -> serde_json::Value {
        match event {
            RestoreEvent::Started {
                job_id,
                machine_name,
                remote_id,
                destination,
            } => {
                let short_id = &job_id[..8.min(job_id.len())];
                json!({
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": "Restore Started",
                                "emoji": true
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Machine:*\n{}", machine_name)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Job ID:*\n`{}`", short_id)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Remote:*\n`{}`", remote_id)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Destination:*\n{}", destination)
                                }
                            ]
                        }
                    ]
                })
            }
            RestoreEvent::Completed {
                job_id,
                machine_name,
                machine_id,
                booted,
            } => {
                let short_id = &job_id[..8.min(job_id.len())];
                let state = if *booted { "imported and booted" } else { "imported" };
                json!({
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": "Restore Complete",
                                "emoji": true
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Machine:*\n{}", machine_name)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Job ID:*\n`{}`", short_id)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*New machine ID:*\n`{}`", machine_id)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*State:*\n{}", state)
                                }
                            ]
                        }
                    ]
                })
            }
            RestoreEvent::Failed {
                job_id,
                machine_name,
                stage,
                error,
            } => {
                let short_id = &job_id[..8.min(job_id.len())];
                json!({
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": "Restore Failed",
                                "emoji": true
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Machine:*\n{}", machine_name)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Job ID:*\n`{}`", short_id)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Stage:*\n{}", stage)
                                }
                            ]
                        },
                        {
                            "type": "section",
                            "text": {
                                "type": "mrkdwn",
                                "text": format!("*Error:*\n```{}```", error)
                            }
                        }
                    ]
                })
            }
            RestoreEvent::RefreshFailed { remote_id, error } => {
                json!({
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": "Catalog Refresh Failed",
                                "emoji": true
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Remote:*\n`{}`", remote_id)
                                }
                            ]
                        },
                        {
                            "type": "section",
                            "text": {
                                "type": "mrkdwn",
                                "text": format!("*Error:*\n```{}```", error)
                            }
                        }
                    ]
                })
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for SlackNotifier {
    async fn notify(&self, event: RestoreEvent) -> Result<()> {
        let payload = self.format_message(&event);
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;
        Ok(())
    }
}
