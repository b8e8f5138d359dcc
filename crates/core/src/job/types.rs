//! Types for the job module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::stage::StageResult;

/// Lifecycle state of a pipeline job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobState {
    /// All states, in lifecycle order.
    pub const ALL: [JobState; 4] = [
        JobState::Queued,
        JobState::Running,
        JobState::Completed,
        JobState::Failed,
    ];

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(JobError::UnknownState(other.to_string())),
        }
    }
}

/// Errors raised by the job state machine and the registry.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job not found.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The job already reached a terminal state.
    #[error("job {id} is already {state}")]
    Terminal { id: String, state: JobState },

    /// The requested transition is not allowed from the current state.
    #[error("invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobState,
        to: JobState,
    },

    /// A stage result was recorded while the job was not running.
    #[error("job {id} is {state}, cannot record stage results")]
    NotRunning { id: String, state: JobState },

    /// Unrecognized state name.
    #[error("unknown job state: {0}")]
    UnknownState(String),
}

/// One end-to-end invocation of the stage list for one subject key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineJob {
    /// Job identifier, unique for the registry lifetime.
    pub id: String,
    /// Subject key threaded through every task.
    pub subject: String,
    /// Current state.
    pub state: JobState,
    /// When the job was created (queued).
    pub created_at: DateTime<Utc>,
    /// When the controller picked the job up.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Results of the stages attempted so far, in configured order.
    pub stages: Vec<StageResult>,
    /// Name of the stage that failed, if the failure came from a stage.
    pub failed_stage: Option<String>,
    /// Error message for failed jobs.
    pub error: Option<String>,
}

impl PipelineJob {
    /// Creates a queued job.
    pub fn new(id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            state: JobState::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            stages: Vec::new(),
            failed_stage: None,
            error: None,
        }
    }

    fn ensure_not_terminal(&self) -> Result<(), JobError> {
        if self.state.is_terminal() {
            return Err(JobError::Terminal {
                id: self.id.clone(),
                state: self.state,
            });
        }
        Ok(())
    }

    /// `queued -> running`.
    pub fn start(&mut self) -> Result<(), JobError> {
        self.ensure_not_terminal()?;
        if self.state != JobState::Queued {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.state,
                to: JobState::Running,
            });
        }
        self.state = JobState::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Appends the result of a finished stage.
    pub fn record_stage(&mut self, result: StageResult) -> Result<(), JobError> {
        self.ensure_not_terminal()?;
        if self.state != JobState::Running {
            return Err(JobError::NotRunning {
                id: self.id.clone(),
                state: self.state,
            });
        }
        self.stages.push(result);
        Ok(())
    }

    /// `running -> completed`.
    pub fn complete(&mut self) -> Result<(), JobError> {
        self.ensure_not_terminal()?;
        if self.state != JobState::Running {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.state,
                to: JobState::Completed,
            });
        }
        self.state = JobState::Completed;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `queued | running -> failed`.
    ///
    /// `failed_stage` is `None` for faults that are not attributable to a
    /// stage, such as an error in the orchestration logic itself.
    pub fn fail(
        &mut self,
        failed_stage: Option<String>,
        error: impl Into<String>,
    ) -> Result<(), JobError> {
        self.ensure_not_terminal()?;
        self.state = JobState::Failed;
        self.failed_stage = failed_stage;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Time from start to finish, once both are known.
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn stage_result(name: &str, success: bool) -> StageResult {
        StageResult {
            stage: name.to_string(),
            success,
            tasks: vec![],
            started_at: Utc::now(),
            duration_ms: Duration::from_millis(5).as_millis() as u64,
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = PipelineJob::new("job-1", "AAPL");
        assert_eq!(job.state, JobState::Queued);
        assert!(job.started_at.is_none());

        job.start().unwrap();
        assert_eq!(job.state, JobState::Running);
        assert!(job.started_at.is_some());

        job.record_stage(stage_result("collection", true)).unwrap();
        job.complete().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert!(job.finished_at.is_some());
        assert!(job.duration_ms().is_some());
        assert_eq!(job.stages.len(), 1);
    }

    #[test]
    fn test_terminal_states_reject_mutation() {
        let mut job = PipelineJob::new("job-1", "AAPL");
        job.start().unwrap();
        job.fail(Some("analysis".to_string()), "stage failed").unwrap();

        assert!(matches!(job.complete(), Err(JobError::Terminal { .. })));
        assert!(matches!(
            job.record_stage(stage_result("forecast", true)),
            Err(JobError::Terminal { .. })
        ));
        assert!(matches!(
            job.fail(None, "again"),
            Err(JobError::Terminal { .. })
        ));
        assert_eq!(job.error.as_deref(), Some("stage failed"));
        assert_eq!(job.failed_stage.as_deref(), Some("analysis"));
    }

    #[test]
    fn test_cannot_complete_without_running() {
        let mut job = PipelineJob::new("job-1", "AAPL");
        assert!(matches!(
            job.complete(),
            Err(JobError::InvalidTransition { .. })
        ));
        assert!(matches!(
            job.record_stage(stage_result("collection", true)),
            Err(JobError::NotRunning { .. })
        ));
    }

    #[test]
    fn test_cannot_start_twice() {
        let mut job = PipelineJob::new("job-1", "AAPL");
        job.start().unwrap();
        let err = job.start().unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
        assert!(err.to_string().contains("running -> running"));
    }

    #[test]
    fn test_queued_job_can_fail() {
        let mut job = PipelineJob::new("job-1", "AAPL");
        job.fail(None, "controller fault").unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(job.failed_stage.is_none());
        assert!(job.duration_ms().is_none());
    }

    #[test]
    fn test_state_round_trip_from_str() {
        for state in JobState::ALL {
            assert_eq!(state.as_str().parse::<JobState>().unwrap(), state);
        }
        assert!(matches!(
            "paused".parse::<JobState>(),
            Err(JobError::UnknownState(_))
        ));
    }

    #[test]
    fn test_job_serialization() {
        let job = PipelineJob::new("job-1", "AAPL");
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"state\":\"queued\""));
        assert!(json.contains("\"subject\":\"AAPL\""));
    }
}
