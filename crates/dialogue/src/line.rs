use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    audio::{AudioFormat, StagedAudioFile},
    deadline,
    encoder::AudioEncoder,
    error::{JobError, PipelineError, Stage, StageTracker},
    speaker::SpeakerResolver,
    staging::JobStaging,
    synthesis::{SynthesisProvider, SynthesisRequest},
    types::DialogueLine,
};

/// Resolves, synthesizes and encodes one dialogue line
pub struct LineProcessor {
    resolver: SpeakerResolver,
    synthesizer: Arc<dyn SynthesisProvider>,
    encoder: AudioEncoder,
    format: AudioFormat,
    synthesis_timeout: Duration,
}

impl LineProcessor {
    pub fn new(
        resolver: SpeakerResolver,
        synthesizer: Arc<dyn SynthesisProvider>,
        encoder: AudioEncoder,
        format: AudioFormat,
        synthesis_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            synthesizer,
            encoder,
            format,
            synthesis_timeout,
        }
    }

    /// Produce the staged WAV file for `line`
    ///
    /// Any failing step aborts the line; the error carries the stage and the
    /// line's position in the script.
    pub(crate) async fn process(
        &self,
        line: &DialogueLine,
        staging: &JobStaging,
        tracker: &StageTracker,
        cancel: &CancellationToken,
    ) -> Result<StagedAudioFile, JobError> {
        let failed = |stage: Stage| move |source: PipelineError| JobError::at_line(stage, line.sequence, source);

        tracker.enter(Stage::Resolving);
        let speaker = self.resolver.resolve(&line.speaker).map_err(failed(Stage::Resolving))?;

        tracing::info!(
            line = line.sequence,
            speaker = %speaker.slug,
            provider = self.synthesizer.name(),
            "Synthesizing line"
        );

        tracker.enter(Stage::Synthesizing);
        let request = SynthesisRequest {
            text: &line.text,
            voice_id: &speaker.voice_id,
            format: self.format,
        };
        let samples = deadline::guard(
            "synthesis",
            self.synthesis_timeout,
            cancel,
            self.synthesizer.synthesize(&request),
        )
        .await
        .map_err(failed(Stage::Synthesizing))?;

        tracker.enter(Stage::Encoding);
        let (raw, wav) = staging.line_paths(line.sequence, &speaker.slug);
        let byte_size = self
            .encoder
            .encode(&samples, &raw, &wav, self.format, cancel)
            .await
            .map_err(failed(Stage::Encoding))?;

        tracing::debug!(line = line.sequence, bytes = byte_size, "Line staged");

        Ok(StagedAudioFile {
            path: wav,
            sequence: line.sequence,
            speaker: speaker.slug.clone(),
            byte_size,
        })
    }
}
