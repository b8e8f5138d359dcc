//! Stage module: a group of independent tasks run concurrently.
//!
//! The [`StageExecutor`] submits every task of a stage to a worker pool
//! bounded by `max_concurrency`. It never short-circuits: a failing or slow
//! task does not stop its siblings, and the stage outcome is computed only
//! once every task has finished or been killed at its deadline.

mod executor;
mod types;

pub use executor::{StageExecutor, DEFAULT_MAX_CONCURRENCY};
pub use types::{StageResult, StageSpec};
