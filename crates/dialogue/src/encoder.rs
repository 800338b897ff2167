use std::{path::Path, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    audio::AudioFormat,
    deadline,
    error::{PipelineError, Result},
    transcoder::Transcoder,
};

/// Turns synthesized samples into a staged WAV file
pub struct AudioEncoder {
    transcoder: Arc<dyn Transcoder>,
    timeout: Duration,
}

impl AudioEncoder {
    pub fn new(transcoder: Arc<dyn Transcoder>, timeout: Duration) -> Self {
        Self { transcoder, timeout }
    }

    /// Write `samples` to `raw`, then wrap them into `wav`
    ///
    /// Returns the size of the WAV file. The raw file stays in the staging
    /// directory until the job is cleaned up.
    pub async fn encode(
        &self,
        samples: &[u8],
        raw: &Path,
        wav: &Path,
        format: AudioFormat,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if samples.is_empty() {
            return Err(PipelineError::EncodingFailed("no samples to encode".to_owned()));
        }

        tokio::fs::write(raw, samples)
            .await
            .map_err(|e| PipelineError::io(format_args!("failed to write {}", raw.display()), &e))?;

        deadline::guard(
            "encoding",
            self.timeout,
            cancel,
            self.transcoder.encode(raw, wav, format),
        )
        .await?;

        let metadata = tokio::fs::metadata(wav).await.map_err(|e| {
            PipelineError::EncodingFailed(format!("{} produced no output at {}: {e}", self.transcoder.name(), wav.display()))
        })?;

        tracing::debug!(
            wav = %wav.display(),
            bytes = metadata.len(),
            transcoder = self.transcoder.name(),
            "Line encoded"
        );

        Ok(metadata.len())
    }
}
