//! Types for the task module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Deadline applied to a task when nothing more specific is configured.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);

/// A named external unit of work, resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Task name, unique within a pipeline.
    pub name: String,
    /// Program to execute.
    pub program: String,
    /// Fixed arguments placed before the subject key.
    pub args: Vec<String>,
    /// Working directory for the process.
    pub working_dir: Option<PathBuf>,
    /// Hard deadline for one invocation.
    pub timeout: Duration,
}

impl TaskSpec {
    /// Creates a task with no arguments and the default timeout.
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    /// Sets the fixed arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Full argument list for one invocation. The subject key is always last.
    pub fn command_args(&self, subject: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(subject.to_string());
        args
    }
}

/// How a task invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The process exited with a status code. Only code 0 is a success.
    Exited { code: i32 },
    /// The process was terminated without an exit code (e.g. by a signal).
    Terminated { signal: Option<i32> },
    /// The deadline elapsed and the process was killed.
    TimedOut { timeout_ms: u64 },
    /// The process could not be started.
    LaunchFailed { reason: String },
    /// The runner itself failed while supervising the task.
    Crashed { reason: String },
}

impl TaskOutcome {
    /// Whether this outcome counts as a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: 0 })
    }

    /// Short label used for logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Exited { code: 0 } => "success",
            Self::Exited { .. } => "exit_failure",
            Self::Terminated { .. } => "terminated",
            Self::TimedOut { .. } => "timed_out",
            Self::LaunchFailed { .. } => "launch_failed",
            Self::Crashed { .. } => "crashed",
        }
    }

    /// The exit code, when the process exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited { code } => Some(*code),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exited { code } => write!(f, "exited with code {}", code),
            Self::Terminated { signal: Some(signal) } => {
                write!(f, "terminated by signal {}", signal)
            }
            Self::Terminated { signal: None } => write!(f, "terminated abnormally"),
            Self::TimedOut { timeout_ms } => write!(f, "timed out after {} ms", timeout_ms),
            Self::LaunchFailed { reason } => write!(f, "failed to launch: {}", reason),
            Self::Crashed { reason } => write!(f, "runner fault: {}", reason),
        }
    }
}

/// Outcome of one task invocation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task name.
    pub task: String,
    /// Whether the task succeeded.
    pub success: bool,
    /// How the task ended.
    pub outcome: TaskOutcome,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl TaskResult {
    /// Creates a result; `success` is derived from the outcome.
    pub fn new(
        task: impl Into<String>,
        outcome: TaskOutcome,
        stdout: String,
        stderr: String,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            task: task.into(),
            success: outcome.is_success(),
            outcome,
            stdout,
            stderr,
            started_at,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Creates a failed result for a fault raised outside the task itself.
    pub fn crashed(
        task: impl Into<String>,
        reason: impl Into<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self::new(
            task,
            TaskOutcome::Crashed {
                reason: reason.into(),
            },
            String::new(),
            String::new(),
            started_at,
            duration,
        )
    }

    /// Whether this task was killed at its deadline.
    pub fn timed_out(&self) -> bool {
        matches!(self.outcome, TaskOutcome::TimedOut { .. })
    }
}
