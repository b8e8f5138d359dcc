//! In-memory job registry.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{JobError, JobState, PipelineJob};

/// Filter for listing jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub state: Option<JobState>,
    pub subject: Option<String>,
    pub limit: Option<usize>,
}

impl JobFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, job: &PipelineJob) -> bool {
        self.state.map_or(true, |s| job.state == s)
            && self.subject.as_deref().map_or(true, |s| job.subject == s)
    }
}

/// Process-wide table of pipeline jobs.
///
/// Cloning is cheap and every clone shares the same table. Readers always
/// get a full snapshot: updates are applied to a copy of the record and
/// swapped in under the write lock, so a failed update leaves the stored
/// job untouched.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, PipelineJob>>>,
}

impl JobRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queued job for `subject` and returns its snapshot.
    pub async fn create(&self, subject: &str) -> PipelineJob {
        let mut jobs = self.jobs.write().await;

        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !jobs.contains_key(&candidate) {
                break candidate;
            }
        };

        let job = PipelineJob::new(id.clone(), subject);
        jobs.insert(id, job.clone());
        job
    }

    /// Returns a snapshot of the job, or `None` if the id is unknown.
    pub async fn get(&self, id: &str) -> Option<PipelineJob> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Applies `f` to the job atomically and returns the new snapshot.
    pub async fn update<F>(&self, id: &str, f: F) -> Result<PipelineJob, JobError>
    where
        F: FnOnce(&mut PipelineJob) -> Result<(), JobError>,
    {
        let mut jobs = self.jobs.write().await;
        let stored = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        let mut next = stored.clone();
        f(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }

    /// Lists jobs matching the filter, newest first.
    pub async fn list(&self, filter: &JobFilter) -> Vec<PipelineJob> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<PipelineJob> =
            jobs.values().filter(|j| filter.matches(j)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            matching.truncate(limit);
        }
        matching
    }

    /// Number of jobs per state.
    pub async fn counts(&self) -> HashMap<JobState, usize> {
        let jobs = self.jobs.read().await;
        let mut counts: HashMap<JobState, usize> =
            JobState::ALL.iter().map(|s| (*s, 0)).collect();
        for job in jobs.values() {
            *counts.entry(job.state).or_default() += 1;
        }
        counts
    }

    /// Total number of jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
