//! Stage executor implementation.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::metrics;
use crate::task::{TaskResult, TaskRunner};

use super::types::{StageResult, StageSpec};

/// Worker-pool size used when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Keeps the active-task gauge honest even if a runner panics.
struct ActiveTaskGuard;

impl ActiveTaskGuard {
    fn enter() -> Self {
        metrics::TASKS_ACTIVE.inc();
        Self
    }
}

impl Drop for ActiveTaskGuard {
    fn drop(&mut self) {
        metrics::TASKS_ACTIVE.dec();
    }
}

/// Runs all tasks of a stage with bounded parallelism.
#[derive(Clone)]
pub struct StageExecutor {
    runner: Arc<dyn TaskRunner>,
    max_concurrency: usize,
}

impl StageExecutor {
    /// Creates an executor. A concurrency of 0 is treated as 1.
    pub fn new(runner: Arc<dyn TaskRunner>, max_concurrency: usize) -> Self {
        Self {
            runner,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Worker-pool size per stage.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// The task runner used for every task.
    pub fn runner(&self) -> &Arc<dyn TaskRunner> {
        &self.runner
    }

    /// Runs every task of `stage` for `subject` and aggregates the results.
    ///
    /// Each task runs on its own tokio task behind a semaphore sized
    /// `max_concurrency`, so tasks beyond the pool size wait for a free slot.
    /// A panic inside a worker is recorded as a crashed task result instead of
    /// aborting the stage.
    pub async fn run_stage(&self, stage: &StageSpec, subject: &str) -> StageResult {
        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            stage = %stage.name,
            subject,
            tasks = stage.tasks.len(),
            max_concurrency = self.max_concurrency,
            "Starting stage"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let handles: Vec<_> = stage
            .tasks
            .iter()
            .cloned()
            .map(|task| {
                let runner = Arc::clone(&self.runner);
                let semaphore = Arc::clone(&semaphore);
                let subject = subject.to_string();

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return TaskResult::crashed(
                                &task.name,
                                "worker pool closed",
                                Utc::now(),
                                std::time::Duration::ZERO,
                            );
                        }
                    };
                    let _active = ActiveTaskGuard::enter();
                    runner.run(&task, &subject, task.timeout).await
                })
            })
            .collect();

        let results: Vec<TaskResult> = join_all(handles)
            .await
            .into_iter()
            .zip(stage.tasks.iter())
            .map(|(joined, task)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(stage = %stage.name, task = %task.name, "Task worker aborted: {}", e);
                    TaskResult::crashed(
                        &task.name,
                        format!("task worker aborted: {}", e),
                        started_at,
                        start.elapsed(),
                    )
                }
            })
            .collect();

        for result in &results {
            metrics::TASK_RUNS
                .with_label_values(&[result.task.as_str(), result.outcome.label()])
                .inc();
            metrics::TASK_DURATION
                .with_label_values(&[result.task.as_str()])
                .observe(result.duration_ms as f64 / 1000.0);
        }

        let stage_result = StageResult::from_tasks(&stage.name, results, started_at, start.elapsed());

        let label = if stage_result.success { "success" } else { "failed" };
        metrics::STAGE_RUNS
            .with_label_values(&[stage.name.as_str(), label])
            .inc();
        metrics::STAGE_DURATION
            .with_label_values(&[stage.name.as_str()])
            .observe(stage_result.duration_ms as f64 / 1000.0);

        if stage_result.success {
            info!(
                stage = %stage.name,
                subject,
                duration_ms = stage_result.duration_ms,
                "Stage completed"
            );
        } else {
            error!(
                stage = %stage.name,
                subject,
                failed_tasks = ?stage_result.failed_tasks(),
                "Stage failed"
            );
        }

        stage_result
    }
}
