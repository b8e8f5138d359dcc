//! Mock task runner for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::task::{TaskOutcome, TaskResult, TaskRunner, TaskSpec};

/// Scripted behavior of one mock task.
#[derive(Debug, Clone)]
pub enum TaskBehavior {
    /// Exit 0 after `delay`, printing `stdout`.
    Succeed { delay: Duration, stdout: String },
    /// Exit with `code` after `delay`, printing `stderr`.
    Fail {
        code: i32,
        delay: Duration,
        stderr: String,
    },
    /// Never finish on its own; ends at the deadline as a timeout.
    Hang,
    /// Panic inside the runner.
    Panic,
    /// Fail to launch.
    LaunchError(String),
}

impl Default for TaskBehavior {
    fn default() -> Self {
        Self::succeed()
    }
}

impl TaskBehavior {
    /// Succeed immediately.
    pub fn succeed() -> Self {
        Self::succeed_after(Duration::ZERO)
    }

    /// Succeed after `delay`.
    pub fn succeed_after(delay: Duration) -> Self {
        Self::Succeed {
            delay,
            stdout: String::new(),
        }
    }

    /// Exit with `code` immediately.
    pub fn fail(code: i32) -> Self {
        Self::fail_after(code, Duration::ZERO)
    }

    /// Exit with `code` after `delay`.
    pub fn fail_after(code: i32, delay: Duration) -> Self {
        Self::Fail {
            code,
            delay,
            stderr: format!("mock failure (exit {})", code),
        }
    }
}

/// A recorded invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    /// Task name.
    pub task: String,
    /// Subject key passed to the task.
    pub subject: String,
    /// Deadline the runner was given.
    pub timeout: Duration,
}

struct ActiveSlot<'a> {
    active: &'a AtomicUsize,
}

impl<'a> ActiveSlot<'a> {
    fn enter(active: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the TaskRunner trait.
///
/// Provides controllable behavior for testing:
/// - Per-task scripted outcomes with delays
/// - Deadlines honored like the process runner (a task slower than its
///   timeout ends as `timed_out` at the deadline)
/// - Invocation recording and peak concurrency tracking
///
/// # Example
///
/// ```rust,ignore
/// use conductor_core::testing::{MockTaskRunner, TaskBehavior};
///
/// let runner = MockTaskRunner::new();
/// runner.set_behavior("scrape_articles", TaskBehavior::fail(1)).await;
///
/// // ... run a stage ...
///
/// assert_eq!(runner.invocation_count().await, 3);
/// assert!(runner.peak_concurrency() <= 2);
/// ```
#[derive(Debug, Default)]
pub struct MockTaskRunner {
    /// Per-task behavior overrides.
    behaviors: Arc<RwLock<HashMap<String, TaskBehavior>>>,
    /// Behavior for tasks without an override.
    default_behavior: Arc<RwLock<TaskBehavior>>,
    /// Recorded invocations.
    invocations: Arc<RwLock<Vec<RecordedInvocation>>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockTaskRunner {
    /// Create a new mock runner where every task succeeds immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior of one task.
    pub async fn set_behavior(&self, task: &str, behavior: TaskBehavior) {
        self.behaviors
            .write()
            .await
            .insert(task.to_string(), behavior);
    }

    /// Script the behavior of every task without an override.
    pub async fn set_default_behavior(&self, behavior: TaskBehavior) {
        *self.default_behavior.write().await = behavior;
    }

    /// All recorded invocations, in start order.
    pub async fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations.read().await.clone()
    }

    /// Total number of invocations.
    pub async fn invocation_count(&self) -> usize {
        self.invocations.read().await.len()
    }

    /// Number of invocations of one task.
    pub async fn invocations_of(&self, task: &str) -> usize {
        self.invocations
            .read()
            .await
            .iter()
            .filter(|i| i.task == task)
            .count()
    }

    /// Highest number of tasks observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn behavior_for(&self, task: &str) -> TaskBehavior {
        if let Some(behavior) = self.behaviors.read().await.get(task) {
            return behavior.clone();
        }
        self.default_behavior.read().await.clone()
    }
}

/// Sleeps for `delay`, or until `timeout` if that comes first.
/// Returns false when the deadline was hit.
async fn sleep_within(delay: Duration, timeout: Duration) -> bool {
    if delay > timeout {
        tokio::time::sleep(timeout).await;
        return false;
    }
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    true
}

#[async_trait]
impl TaskRunner for MockTaskRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, task: &TaskSpec, subject: &str, timeout: Duration) -> TaskResult {
        let started_at = Utc::now();
        let start = Instant::now();

        self.invocations.write().await.push(RecordedInvocation {
            task: task.name.clone(),
            subject: subject.to_string(),
            timeout,
        });

        let behavior = self.behavior_for(&task.name).await;
        let _slot = ActiveSlot::enter(&self.active, &self.peak);

        let timed_out = TaskOutcome::TimedOut {
            timeout_ms: timeout.as_millis() as u64,
        };

        let (outcome, stdout, stderr) = match behavior {
            TaskBehavior::Succeed { delay, stdout } => {
                if sleep_within(delay, timeout).await {
                    (TaskOutcome::Exited { code: 0 }, stdout, String::new())
                } else {
                    (timed_out, String::new(), String::new())
                }
            }
            TaskBehavior::Fail {
                code,
                delay,
                stderr,
            } => {
                if sleep_within(delay, timeout).await {
                    (TaskOutcome::Exited { code }, String::new(), stderr)
                } else {
                    (timed_out, String::new(), String::new())
                }
            }
            TaskBehavior::Hang => {
                tokio::time::sleep(timeout).await;
                (timed_out, String::new(), String::new())
            }
            TaskBehavior::Panic => panic!("mock task '{}' panicked", task.name),
            TaskBehavior::LaunchError(reason) => (
                TaskOutcome::LaunchFailed { reason },
                String::new(),
                String::new(),
            ),
        };

        TaskResult::new(
            &task.name,
            outcome,
            stdout,
            stderr,
            started_at,
            start.elapsed(),
        )
    }
}
