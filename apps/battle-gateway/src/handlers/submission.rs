use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use battle_models::{AdmissionError, GenerationRequest, GenerationResult};
use generation_pipeline::SubmissionOutcome;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, serde::Deserialize)]
pub struct SubmitRequest {
    pub submitter_id: String,
    pub request: GenerationRequest,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub state: &'static str,
    pub cache_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_wait_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitErrorResponse {
    pub error: String,
    pub message: String,
}

/// POST /api/v1/generate — job submission boundary. Status codes: 202 on a
/// new or deduplicated job, 200 on a cache hit, 400 on validation failure,
/// 429 on user limit or system full.
#[instrument(skip(state, payload), fields(submitter_id = %payload.submitter_id))]
pub async fn submit(State(state): State<AppState>, Json(payload): Json<SubmitRequest>) -> impl IntoResponse {
    match state.generation.submitter.submit(&payload.submitter_id, payload.request) {
        Ok(SubmissionOutcome::CacheHit { job_id, result }) => (
            StatusCode::OK,
            Json(SubmitResponse {
                job_id,
                state: "completed",
                cache_hit: true,
                result: Some(result),
                estimated_wait_ms: None,
                warning: None,
            }),
        )
            .into_response(),
        Ok(SubmissionOutcome::Deduplicated { job_id }) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                job_id,
                state: "processing",
                cache_hit: false,
                result: None,
                estimated_wait_ms: None,
                warning: None,
            }),
        )
            .into_response(),
        Ok(SubmissionOutcome::Admitted { job_id, estimated_wait_ms, warning }) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                job_id,
                state: "pending",
                cache_hit: false,
                result: None,
                estimated_wait_ms: Some(estimated_wait_ms),
                warning,
            }),
        )
            .into_response(),
        Err(err) => admission_error_response(err),
    }
}

fn admission_error_response(err: AdmissionError) -> axum::response::Response {
    let (status, code) = match &err {
        AdmissionError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        AdmissionError::UserLimitExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "user_limit_exceeded"),
        AdmissionError::SystemQueueFull => (StatusCode::TOO_MANY_REQUESTS, "system_queue_full"),
        AdmissionError::EnqueueFailed(_) => (StatusCode::SERVICE_UNAVAILABLE, "enqueue_failed"),
    };
    (status, Json(SubmitErrorResponse { error: code.to_string(), message: err.to_string() })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_limit_exceeded_maps_to_429() {
        let resp = admission_error_response(AdmissionError::UserLimitExceeded { current: 5, max: 5 });
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn invalid_request_maps_to_400() {
        let resp = admission_error_response(AdmissionError::InvalidRequest("bad".into()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
