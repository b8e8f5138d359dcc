use conductor_core::{Config, JobRegistry, PipelineTrigger};

/// Shared application state
pub struct AppState {
    config: Config,
    trigger: PipelineTrigger,
}

impl AppState {
    pub fn new(config: Config, trigger: PipelineTrigger) -> Self {
        Self { config, trigger }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn trigger(&self) -> &PipelineTrigger {
        &self.trigger
    }

    pub fn registry(&self) -> &JobRegistry {
        self.trigger.registry()
    }
}
