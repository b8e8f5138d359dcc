//! Pipeline controller implementation.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::job::{JobRegistry, PipelineJob};
use crate::metrics;
use crate::stage::{StageExecutor, StageSpec};
use crate::task::{TaskRunner, TaskSpec};

use super::error::PipelineError;

/// Runs the ordered stage list for a job.
pub struct PipelineController {
    executor: StageExecutor,
    stages: Arc<Vec<StageSpec>>,
    settle_interval: Duration,
    registry: JobRegistry,
}

impl PipelineController {
    /// Creates a controller with no settle interval.
    pub fn new(executor: StageExecutor, stages: Vec<StageSpec>, registry: JobRegistry) -> Self {
        Self {
            executor,
            stages: Arc::new(stages),
            settle_interval: Duration::ZERO,
            registry,
        }
    }

    /// Builds a controller from the pipeline section of the configuration.
    pub fn from_config(
        config: &PipelineConfig,
        runner: Arc<dyn TaskRunner>,
        registry: JobRegistry,
    ) -> Self {
        let executor = StageExecutor::new(runner, config.max_concurrency);
        Self::new(executor, config.stage_specs(), registry)
            .with_settle_interval(config.settle_interval())
    }

    /// Sets the pause inserted between two consecutive stages.
    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn executor(&self) -> &StageExecutor {
        &self.executor
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn settle_interval(&self) -> Duration {
        self.settle_interval
    }

    /// Finds a configured task across all stages.
    ///
    /// Task names win. Otherwise a task matches when one of its arguments,
    /// or that argument's file name, equals `name`, so older clients can
    /// still address a task by its script file.
    pub fn find_task(&self, name: &str) -> Option<&TaskSpec> {
        self.stages
            .iter()
            .find_map(|stage| stage.task(name))
            .or_else(|| {
                self.stages
                    .iter()
                    .flat_map(|stage| stage.tasks.iter())
                    .find(|task| task.args.iter().any(|arg| script_matches(arg, name)))
            })
    }

    /// Names of all configured tasks, in stage order.
    pub fn task_names(&self) -> Vec<String> {
        self.stages
            .iter()
            .flat_map(|stage| stage.tasks.iter().map(|t| t.name.clone()))
            .collect()
    }

    /// Runs every stage for a queued job and returns the final snapshot.
    ///
    /// Stages run strictly in order. The first stage whose aggregate success
    /// is false fails the job and no later stage is attempted. The settle
    /// interval elapses before every stage except the first.
    ///
    /// An `Err` means the orchestration itself went wrong (for example the
    /// job was not in `queued` state); it is not a stage failure.
    pub async fn run(&self, job_id: &str) -> Result<PipelineJob, PipelineError> {
        let job = self.registry.update(job_id, PipelineJob::start).await?;
        let subject = job.subject;

        info!(
            job_id,
            subject = %subject,
            stages = self.stages.len(),
            "Pipeline started"
        );

        for (index, stage) in self.stages.iter().enumerate() {
            if index > 0 && !self.settle_interval.is_zero() {
                debug!(
                    job_id,
                    stage = %stage.name,
                    settle_ms = self.settle_interval.as_millis() as u64,
                    "Waiting for previous stage output to settle"
                );
                tokio::time::sleep(self.settle_interval).await;
            }

            let result = self.executor.run_stage(stage, &subject).await;
            let success = result.success;
            let failed_tasks = result.failed_tasks().join(", ");

            // Stage result and failure are recorded in one update.
            let job = self
                .registry
                .update(job_id, |job| {
                    job.record_stage(result)?;
                    if !success {
                        job.fail(
                            Some(stage.name.clone()),
                            format!("stage '{}' failed: {}", stage.name, failed_tasks),
                        )?;
                    }
                    Ok(())
                })
                .await?;

            if !success {
                error!(
                    job_id,
                    subject = %subject,
                    stage = %stage.name,
                    "{}",
                    job.error.as_deref().unwrap_or_default()
                );
                return Ok(job);
            }
        }

        let job = self.registry.update(job_id, PipelineJob::complete).await?;
        info!(
            job_id,
            subject = %subject,
            duration_ms = job.duration_ms().unwrap_or_default(),
            "Pipeline completed"
        );
        Ok(job)
    }

    /// Runs the pipeline on its own tokio task and records any fault.
    ///
    /// Both an `Err` from [`run`](Self::run) and a panic inside it end with
    /// the job marked `failed` without a `failed_stage`. Returns the final
    /// snapshot, or `None` if the job id is unknown.
    pub async fn supervise(self: Arc<Self>, job_id: String) -> Option<PipelineJob> {
        let start = Instant::now();

        let controller = Arc::clone(&self);
        let id = job_id.clone();
        let handle = tokio::spawn(async move { controller.run(&id).await });

        let fault = match handle.await {
            Ok(Ok(job)) => {
                record_pipeline_metrics(job.state.as_str(), start.elapsed());
                return Some(job);
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) if e.is_panic() => format!("panicked: {}", panic_message(e.into_panic())),
            Err(e) => format!("controller task aborted: {}", e),
        };

        error!(job_id = %job_id, "Pipeline controller fault: {}", fault);
        record_pipeline_metrics("fault", start.elapsed());

        let message = format!("controller fault: {}", fault);
        match self
            .registry
            .update(&job_id, |job| job.fail(None, message))
            .await
        {
            Ok(job) => Some(job),
            Err(e) => {
                warn!(job_id = %job_id, "Could not record controller fault: {}", e);
                self.registry.get(&job_id).await
            }
        }
    }
}

fn record_pipeline_metrics(result: &str, elapsed: Duration) {
    metrics::PIPELINE_RUNS.with_label_values(&[result]).inc();
    metrics::PIPELINE_DURATION.observe(elapsed.as_secs_f64());
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn script_matches(arg: &str, name: &str) -> bool {
    arg == name || Path::new(arg).file_name().is_some_and(|f| f == name)
}
