use std::sync::Arc;

use crate::config::settings::TriggerConfig;
use crate::infrastructure::jobs::cloud_run::JobExecutor;

#[derive(Clone)]
pub struct AppState {
    pub config: TriggerConfig,
    pub executor: Arc<dyn JobExecutor>,
}

impl AppState {
    pub fn new(config: TriggerConfig, executor: Arc<dyn JobExecutor>) -> Self {
        Self { config, executor }
    }
}
