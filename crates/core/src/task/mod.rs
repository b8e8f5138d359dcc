//! Task module: one external unit of work run for one subject key.
//!
//! A task is an external program. It receives the subject key as its last
//! argument, runs under a deadline, and finishes with an exit status plus
//! whatever it wrote to stdout and stderr. The runner does not know what
//! the task actually does, only whether it exited cleanly.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use conductor_core::task::{ProcessRunner, TaskRunner, TaskSpec};
//!
//! let task = TaskSpec::new("fetch_press_releases", "python3")
//!     .with_args(["fetch_press_releases_render.py"])
//!     .with_timeout(Duration::from_secs(300));
//!
//! let runner = ProcessRunner::new();
//! let result = runner.run(&task, "AAPL", task.timeout).await;
//! println!("{} -> {}", result.task, result.outcome.label());
//! ```

mod process;
mod runner;
mod types;

pub use process::ProcessRunner;
pub use runner::TaskRunner;
pub use types::{TaskOutcome, TaskResult, TaskSpec, DEFAULT_TASK_TIMEOUT};
