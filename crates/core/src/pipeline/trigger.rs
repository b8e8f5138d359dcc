//! Trigger service: starts pipelines in the background.

use std::sync::Arc;
use tracing::info;

use crate::job::{JobError, JobRegistry, PipelineJob};
use crate::metrics;
use crate::subject::SubjectKey;
use crate::task::TaskResult;

use super::controller::PipelineController;
use super::error::TriggerError;

/// Entry point used by the HTTP layer and the CLI.
#[derive(Clone)]
pub struct PipelineTrigger {
    controller: Arc<PipelineController>,
}

impl PipelineTrigger {
    pub fn new(controller: Arc<PipelineController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<PipelineController> {
        &self.controller
    }

    pub fn registry(&self) -> &JobRegistry {
        self.controller.registry()
    }

    /// Validates the subject, creates a queued job and starts the pipeline
    /// on a spawned task. Returns the queued snapshot without waiting.
    pub async fn trigger(&self, subject: &str) -> Result<PipelineJob, TriggerError> {
        let subject = SubjectKey::parse(subject)?;
        let job = self.registry().create(subject.as_str()).await;

        info!(job_id = %job.id, subject = %subject, "Pipeline triggered");

        let controller = Arc::clone(&self.controller);
        let job_id = job.id.clone();
        tokio::spawn(async move {
            controller.supervise(job_id).await;
        });

        Ok(job)
    }

    /// Runs the pipeline for `subject` and waits for the final snapshot.
    pub async fn trigger_and_wait(&self, subject: &str) -> Result<PipelineJob, TriggerError> {
        let subject = SubjectKey::parse(subject)?;
        let job = self.registry().create(subject.as_str()).await;
        let job_id = job.id.clone();

        info!(job_id = %job_id, subject = %subject, "Pipeline started in foreground");

        Arc::clone(&self.controller)
            .supervise(job_id.clone())
            .await
            .ok_or(TriggerError::Job(JobError::NotFound(job_id)))
    }

    /// Current snapshot of a job, or `None` if the id is unknown.
    pub async fn status(&self, job_id: &str) -> Option<PipelineJob> {
        self.registry().get(job_id).await
    }

    /// Runs a single configured task for `subject` and waits for it.
    ///
    /// Only task names present in the stage configuration are accepted.
    pub async fn run_task(&self, task_name: &str, subject: &str) -> Result<TaskResult, TriggerError> {
        let subject = SubjectKey::parse(subject)?;
        let task = self
            .controller
            .find_task(task_name)
            .ok_or_else(|| TriggerError::UnknownTask {
                name: task_name.to_string(),
                available: self.controller.task_names(),
            })?;

        info!(task = %task.name, subject = %subject, "Running single task");

        let result = self
            .controller
            .executor()
            .runner()
            .run(task, subject.as_str(), task.timeout)
            .await;

        metrics::TASK_RUNS
            .with_label_values(&[result.task.as_str(), result.outcome.label()])
            .inc();
        metrics::TASK_DURATION
            .with_label_values(&[result.task.as_str()])
            .observe(result.duration_ms as f64 / 1000.0);

        Ok(result)
    }
}
