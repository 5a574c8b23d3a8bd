use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use generation_pipeline::ProgressEvent;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
enum ProgressFrame {
    Pending { progress: u8 },
    Processing { progress: u8 },
    Completed { result: battle_models::GenerationResult },
    Failed { error: battle_models::JobError },
}

/// GET /api/v1/jobs/:job_id/stream — progress stream boundary. A
/// subscriber attaching mid-job is handed the job's current snapshot before
/// anything else, satisfying "receives the most recent progress snapshot
/// within `update_interval`" without waiting for the next worker publish.
/// Delivery is at-least-once within this connection: coalescing upstream is
/// fine, but the terminal frame always arrives because `commit_success`/
/// `commit_failure` publish it before retiring the channel.
#[instrument(skip(state), fields(%job_id))]
pub async fn stream_progress(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let Some(job) = state.generation.job_store.get(job_id) else {
        return Err(StatusCode::NOT_FOUND);
    };

    let initial = match job.state {
        battle_models::JobState::Completed => job.result.map(|result| ProgressFrame::Completed { result }),
        battle_models::JobState::Failed => job.error.map(|error| ProgressFrame::Failed { error }),
        battle_models::JobState::Pending => Some(ProgressFrame::Pending { progress: job.progress }),
        battle_models::JobState::Processing | battle_models::JobState::Retrying => {
            Some(ProgressFrame::Processing { progress: job.progress })
        }
    };

    let mut receiver = state.generation.progress.subscribe(job_id);
    let keepalive_ms = state.config.stream.keepalive_interval_ms;

    let stream = async_stream::stream! {
        if let Some(frame) = initial {
            yield Ok(Event::default().json_data(frame).expect("progress frame serializes"));
        }
        loop {
            match receiver.recv().await {
                Ok(ProgressEvent::Progress { percent, .. }) => {
                    yield Ok(Event::default().json_data(ProgressFrame::Processing { progress: percent }).expect("progress frame serializes"));
                }
                Ok(ProgressEvent::Completed { job, .. }) => {
                    if let Some(result) = job.result {
                        yield Ok(Event::default().json_data(ProgressFrame::Completed { result }).expect("progress frame serializes"));
                    }
                    break;
                }
                Ok(ProgressEvent::Failed { error, .. }) => {
                    yield Ok(Event::default().json_data(ProgressFrame::Failed { error }).expect("progress frame serializes"));
                    break;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_millis(keepalive_ms))))
}
