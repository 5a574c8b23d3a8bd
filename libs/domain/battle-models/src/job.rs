use chrono::{DateTime, Utc};
use fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::GenerationErrorCategory;
use crate::request::GenerationRequest;
use crate::result::GenerationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Processing,
    Retrying,
    Completed,
    Failed,
}

impl JobState {
    /// Which transitions are legal from this state.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Retrying)
                | (Retrying, Processing)
                | (Retrying, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub category: GenerationErrorCategory,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub submitter_id: String,
    #[serde(skip)]
    pub fingerprint: Option<Fingerprint>,
    pub request: GenerationRequest,
    pub state: JobState,
    pub progress: u8,
    pub attempts_made: u32,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<GenerationResult>,
    pub error: Option<JobError>,
}

impl Job {
    pub fn new(job_id: Uuid, submitter_id: String, fingerprint: Fingerprint, request: GenerationRequest, submitted_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            submitter_id,
            fingerprint: Some(fingerprint),
            request,
            state: JobState::Pending,
            progress: 0,
            attempts_made: 0,
            submitted_at,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    /// Moves the job into `Processing`, recording `started_at` the first
    /// time this happens (retries do not reset it).
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        debug_assert!(self.state.can_transition_to(JobState::Processing));
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.state = JobState::Processing;
    }

    /// Progress resets to 0 on each new attempt; a retry redispatches the whole
    /// request rather than resuming from the last reported percentage.
    pub fn mark_retrying(&mut self) {
        debug_assert!(self.state.can_transition_to(JobState::Retrying));
        self.state = JobState::Retrying;
        self.progress = 0;
        self.attempts_made += 1;
    }

    pub fn mark_progress(&mut self, progress: u8) {
        debug_assert!(progress >= self.progress, "progress must be monotonic within an attempt");
        self.progress = progress;
    }

    pub fn mark_completed(&mut self, result: GenerationResult, now: DateTime<Utc>) {
        debug_assert!(self.state.can_transition_to(JobState::Completed));
        self.progress = 100;
        self.result = Some(result);
        self.state = JobState::Completed;
        self.finished_at = Some(now);
    }

    pub fn mark_failed(&mut self, error: JobError, now: DateTime<Utc>) {
        debug_assert!(self.state.can_transition_to(JobState::Failed));
        self.error = Some(error);
        self.state = JobState::Failed;
        self.finished_at = Some(now);
    }
}
