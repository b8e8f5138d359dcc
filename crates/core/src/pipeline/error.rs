//! Errors for the pipeline controller and trigger service.

use thiserror::Error;

use crate::job::JobError;
use crate::subject::SubjectError;

/// Controller-level fault. Task and stage failures are not errors: they
/// end up in the job's stage results.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Job(#[from] JobError),
}

/// Errors returned to callers of the trigger service.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("invalid symbol: {0}")]
    InvalidSubject(#[from] SubjectError),

    #[error("unknown task '{name}', allowed tasks: {}", .available.join(", "))]
    UnknownTask { name: String, available: Vec<String> },

    #[error(transparent)]
    Job(#[from] JobError),
}
