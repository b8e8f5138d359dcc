//! Types for the stage module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::task::{TaskResult, TaskSpec};

/// An ordered phase of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Stage name.
    pub name: String,
    /// Tasks of this stage. They make no ordering assumption about each other.
    pub tasks: Vec<TaskSpec>,
}

impl StageSpec {
    /// Creates a stage.
    pub fn new(name: impl Into<String>, tasks: Vec<TaskSpec>) -> Self {
        Self {
            name: name.into(),
            tasks,
        }
    }

    /// Finds a task of this stage by name.
    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// Outcome of one stage. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage: String,
    /// True iff every task succeeded.
    pub success: bool,
    /// Task results, in configured task order.
    pub tasks: Vec<TaskResult>,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl StageResult {
    /// Aggregates task results into a stage result.
    pub fn from_tasks(
        stage: impl Into<String>,
        tasks: Vec<TaskResult>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            stage: stage.into(),
            success: tasks.iter().all(|t| t.success),
            tasks,
            started_at,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Names of the tasks that did not succeed.
    pub fn failed_tasks(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| !t.success)
            .map(|t| t.task.as_str())
            .collect()
    }

    /// Looks up the result of one task.
    pub fn task(&self, name: &str) -> Option<&TaskResult> {
        self.tasks.iter().find(|t| t.task == name)
    }
}
