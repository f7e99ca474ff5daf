use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::notifications::{self, NotificationChannel};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub notifier: Option<Arc<dyn NotificationChannel>>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        let notifier = notifications::create_notifier(&config.notifications);
        Self {
            config: Arc::new(config),
            notifier,
        }
    }
}
