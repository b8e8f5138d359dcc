pub mod config;
pub mod job;
pub mod metrics;
pub mod pipeline;
pub mod stage;
pub mod subject;
pub mod task;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, LogFormat, LoggingConfig, PipelineConfig, ServerConfig, StageConfig, TaskConfig,
};
pub use job::{JobError, JobFilter, JobRegistry, JobState, PipelineJob};
pub use pipeline::{PipelineController, PipelineError, PipelineTrigger, TriggerError};
pub use stage::{StageExecutor, StageResult, StageSpec, DEFAULT_MAX_CONCURRENCY};
pub use subject::{SubjectError, SubjectKey};
pub use task::{ProcessRunner, TaskOutcome, TaskResult, TaskRunner, TaskSpec};
