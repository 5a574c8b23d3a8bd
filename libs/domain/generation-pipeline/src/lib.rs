//! Sprite generation job queue: admission, user and system admission
//! control, the worker pool that drives external calls through retry and
//! backoff, and progress pub-sub.

mod pipeline;
mod progress;
mod queue_monitor;
mod submitter;
mod user_limits;
mod worker;

pub use pipeline::GenerationPipeline;
pub use progress::{ProgressBus, ProgressEvent};
pub use queue_monitor::{QueuePressure, QueueSizeMonitor, QueueSnapshot};
pub use submitter::{JobSubmitter, SubmissionOutcome};
pub use user_limits::UserLimitsCache;
pub use worker::PipelineWorker;
