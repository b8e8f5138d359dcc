//! Testing utilities and mock implementations.
//!
//! This module provides a scriptable [`TaskRunner`](crate::task::TaskRunner)
//! so that stage, pipeline and HTTP tests can run without spawning real
//! processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use conductor_core::testing::{fixtures, MockTaskRunner, TaskBehavior};
//!
//! let runner = MockTaskRunner::new();
//! runner.set_behavior("t3", TaskBehavior::fail(1)).await;
//!
//! let stages = vec![
//!     fixtures::stage("StageA", &["t1"]),
//!     fixtures::stage("StageB", &["t2", "t3"]),
//! ];
//! ```

mod mock_runner;

pub use mock_runner::{MockTaskRunner, RecordedInvocation, TaskBehavior};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::time::Duration;

    use crate::stage::StageSpec;
    use crate::task::TaskSpec;

    /// Create a task for the mock runner with a generous timeout.
    pub fn task(name: &str) -> TaskSpec {
        TaskSpec::new(name, "mock").with_timeout(Duration::from_secs(30))
    }

    /// Create a stage of mock tasks.
    pub fn stage(name: &str, tasks: &[&str]) -> StageSpec {
        StageSpec::new(name, tasks.iter().map(|t| task(t)).collect())
    }

    /// Create a stage where every task shares the same timeout.
    pub fn stage_with_timeout(name: &str, tasks: &[&str], timeout: Duration) -> StageSpec {
        StageSpec::new(
            name,
            tasks
                .iter()
                .map(|t| task(t).with_timeout(timeout))
                .collect(),
        )
    }
}
