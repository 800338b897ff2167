#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod assembler;
mod audio;
mod deadline;
mod encoder;
mod error;
mod http_client;
mod line;
mod pipeline;
mod request;
mod speaker;
mod staging;
mod storage;
mod synthesis;
mod transcoder;
mod types;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use tokio_util::sync::CancellationToken;

pub use error::{JobError, PipelineError, Result, Stage};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use types::{AudioRequest, AudioResponse, DialogueInput, Job, JobId};
use request::ExtractPayload;

/// Shared state of the dialogue endpoints
#[derive(Clone)]
pub struct DialogueState {
    pipeline: Arc<Pipeline>,
    /// Parent of every job's cancellation token
    shutdown: CancellationToken,
}

/// Build the dialogue pipeline from configuration
///
/// Creates the staging root so the first job does not have to.
pub async fn build_state(config: &duet_config::Config, shutdown: CancellationToken) -> anyhow::Result<DialogueState> {
    let pipeline = PipelineBuilder::new(config)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to initialize dialogue pipeline: {e}"))?;

    pipeline
        .prepare()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to prepare staging area: {e}"))?;

    Ok(DialogueState {
        pipeline: Arc::new(pipeline),
        shutdown,
    })
}

/// Create the endpoint router for dialogue audio
pub fn endpoint_router() -> Router<DialogueState> {
    Router::new()
        .route("/api/generate-audio-chunk", post(generate_audio))
        .route("/v1/dialogue/audio", post(generate_audio))
}

/// Handle single-line and batch audio requests
async fn generate_audio(
    State(state): State<DialogueState>,
    ExtractPayload(request): ExtractPayload<AudioRequest>,
) -> std::result::Result<Json<AudioResponse>, JobError> {
    let job = Job::try_from(request)?;

    tracing::debug!(job_id = %job.id(), kind = job.kind(), "Audio request accepted");

    // A dropped request future drops the job, whose staging guard then
    // removes its files.
    let cancel = state.shutdown.child_token();
    let response = state.pipeline.run(job, &cancel).await?;

    Ok(Json(response))
}
