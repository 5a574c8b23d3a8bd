use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Classifies external-call failures inside the pipeline by how a worker should react.
#[derive(Debug, Clone, Serialize, Deserialize, Error)]
pub enum GenerationErrorCategory {
    #[error("authentication failure talking to an external service")]
    Authentication,
    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },
    #[error("quota exceeded")]
    QuotaExceeded,
    #[error("external call timed out")]
    Timeout,
    #[error("network error: {cause}")]
    Network { cause: String },
    #[error("server error ({status})")]
    ServerError { status: u16 },
    #[error("validation failed: {field_errors:?}")]
    Validation { field_errors: Vec<String> },
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
    #[error("unknown failure: {detail}")]
    Unknown { detail: String },
}

impl GenerationErrorCategory {
    /// Whether a pipeline worker may retry an attempt that failed with this
    /// category of error.
    pub fn retryable(&self) -> bool {
        use GenerationErrorCategory::*;
        matches!(self, RateLimited { .. } | Timeout | Network { .. } | ServerError { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GenerationErrorCategory::RateLimited { retry_after_ms: Some(ms) } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }
}

/// Failures the Job Submitter can return synchronously from `submit`.
#[derive(Debug, Clone, Error)]
pub enum AdmissionError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("user limit exceeded: {current}/{max} active jobs")]
    UserLimitExceeded { current: u32, max: u32 },
    #[error("system queue is full")]
    SystemQueueFull,
    #[error("failed to enqueue job: {0}")]
    EnqueueFailed(String),
}
