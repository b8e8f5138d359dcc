//! Trait definitions for the task module.

use async_trait::async_trait;
use std::time::Duration;

use super::types::{TaskResult, TaskSpec};

/// Executes one task for one subject key under a deadline.
///
/// Implementations never return an error: a non-zero exit, a timeout, a
/// launch failure or an internal fault all end up as a failed
/// [`TaskResult`] with the output captured so far.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Returns the name of this runner implementation.
    fn name(&self) -> &str;

    /// Runs `task` for `subject`, terminating it once `timeout` elapses.
    async fn run(&self, task: &TaskSpec, subject: &str, timeout: Duration) -> TaskResult;
}
