use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};

/// Run one step of a job under a deadline and the job's cancellation token
///
/// The step future is dropped when either fires, which aborts in-flight
/// HTTP requests and kills transcoder processes.
pub async fn guard<T, F>(operation: &'static str, after: Duration, cancel: &CancellationToken, step: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PipelineError::Cancelled),
        outcome = tokio::time::timeout(after, step) => {
            outcome.unwrap_or(Err(PipelineError::Timeout { operation, after }))
        }
    }
}
