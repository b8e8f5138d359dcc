//! Job module: externally observable state of one pipeline invocation.
//!
//! A [`PipelineJob`] moves through `queued -> running -> completed | failed`.
//! The [`JobRegistry`] is the process-wide table of jobs; it lives for the
//! process lifetime and is not persisted.

mod registry;
mod types;

pub use registry::{JobFilter, JobRegistry};
pub use types::{JobError, JobState, PipelineJob};
