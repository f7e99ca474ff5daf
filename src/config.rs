use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "/etc/vmrestored/config.toml";
const ENV_PREFIX: &str = "VMRESTORED_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the virtualization platform's HTTP API.
    pub platform_url: String,
    /// Seconds between remote-registry polls in the HTTP adapter.
    pub registry_poll_secs: u64,
    /// Run against the in-memory simulated platform instead of HTTP.
    pub simulation: bool,
    pub verbose: bool,
    pub log_json: bool,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub channel: NotificationChannelType,
    pub slack_webhook: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannelType {
    None,
    Slack,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform_url: "http://localhost:9363".to_string(),
            registry_poll_secs: 30,
            simulation: false,
            verbose: false,
            log_json: false,
            notifications: NotificationConfig {
                channel: NotificationChannelType::None,
                slack_webhook: None,
            },
        }
    }
}

impl AppConfig {
    /// Layered config: defaults, then the system TOML file, then
    /// `VMRESTORED_*` environment variables, then CLI overrides.
    pub fn new<T: Serialize>(cli: Option<&T>) -> Result<Self> {
        // Double underscore separates nesting levels, so
        // VMRESTORED_NOTIFICATIONS__SLACK_WEBHOOK reaches
        // notifications.slack_webhook without mangling top-level keys
        // that contain underscores.
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_PATH))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(cli) = cli {
            figment = figment.merge(Serialized::defaults(cli));
        }

        figment.extract().context("Failed to load configuration")
    }
}
