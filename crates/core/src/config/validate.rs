use std::collections::HashSet;

use super::{types::Config, ConfigError};

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Worker pool size and timeouts are not 0
/// - Stage list is non-empty and every stage has tasks
/// - Stage names are unique, task names are unique across the pipeline
/// - Executables are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let pipeline = &config.pipeline;
    if pipeline.max_concurrency == 0 {
        return Err(invalid("pipeline.max_concurrency cannot be 0"));
    }
    if pipeline.task_timeout_secs == 0 {
        return Err(invalid("pipeline.task_timeout_secs cannot be 0"));
    }
    if pipeline.stages.is_empty() {
        return Err(invalid("pipeline.stages cannot be empty"));
    }

    let mut stage_names = HashSet::new();
    let mut task_names = HashSet::new();

    for stage in &pipeline.stages {
        if stage.name.trim().is_empty() {
            return Err(invalid("stage name cannot be empty"));
        }
        if !stage_names.insert(stage.name.as_str()) {
            return Err(invalid(format!("duplicate stage name '{}'", stage.name)));
        }
        if stage.timeout_secs == Some(0) {
            return Err(invalid(format!(
                "stage '{}': timeout_secs cannot be 0",
                stage.name
            )));
        }
        if stage.tasks.is_empty() {
            return Err(invalid(format!("stage '{}' has no tasks", stage.name)));
        }

        for task in &stage.tasks {
            if task.name.trim().is_empty() {
                return Err(invalid(format!(
                    "stage '{}': task name cannot be empty",
                    stage.name
                )));
            }
            if !task_names.insert(task.name.as_str()) {
                return Err(invalid(format!("duplicate task name '{}'", task.name)));
            }
            if task.executable.trim().is_empty() {
                return Err(invalid(format!(
                    "task '{}': executable cannot be empty",
                    task.name
                )));
            }
            if task.timeout_secs == Some(0) {
                return Err(invalid(format!(
                    "task '{}': timeout_secs cannot be 0",
                    task.name
                )));
            }
        }
    }

    Ok(())
}
