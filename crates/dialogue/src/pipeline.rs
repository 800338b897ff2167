use std::{
    collections::HashMap,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use duet_config::{Config, StorageType, SynthesisProviderType};
use duet_telemetry::PipelineMetrics;
use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    assembler::Assembler,
    audio::{AudioFormat, StagedAudioFile, UploadResult},
    deadline,
    encoder::AudioEncoder,
    error::{JobError, PipelineError, Result, Stage, StageTracker},
    http_client::http_client,
    line::LineProcessor,
    speaker::SpeakerResolver,
    staging::{JobStaging, StagingArea},
    storage::{ObjectStore, bytescale::BytescaleStore},
    synthesis::{SynthesisProvider, cartesia::CartesiaProvider},
    transcoder,
    types::{AudioResponse, DialogueLine, Job, JobId},
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Drives jobs through synthesis, assembly, upload and cleanup
pub struct Pipeline {
    lines: LineProcessor,
    assembler: Assembler,
    store: Arc<dyn ObjectStore>,
    staging: StagingArea,
    upload_timeout: Duration,
    max_concurrent_lines: usize,
    upload_individual_lines: bool,
    job_timeout: Option<Duration>,
    metrics: PipelineMetrics,
}

impl Pipeline {
    /// Create the staging root if it is missing
    pub async fn prepare(&self) -> Result<()> {
        self.staging.prepare().await?;
        tracing::debug!(root = %self.staging.root().display(), "Staging area ready");
        Ok(())
    }

    /// Run one job to completion
    ///
    /// The job's staging directory is removed whatever the outcome. Cancelling
    /// `cancel` aborts the job at its next step with `Cancelled`.
    pub async fn run(&self, job: Job, cancel: &CancellationToken) -> std::result::Result<AudioResponse, JobError> {
        let start = Instant::now();
        let kind = job.kind();
        let span = tracing::info_span!("job", job_id = %job.id(), kind);

        async {
            tracing::info!(lines = job.lines().len(), "Job received");

            let tracker = StageTracker::new();
            let result = self.execute(&job, &tracker, cancel).await;

            match &result {
                Ok(_) => {
                    self.metrics.record_job(kind, "success", start);
                    tracing::info!(elapsed_ms = start.elapsed().as_millis(), "Job done");
                }
                Err(e) => {
                    self.metrics.record_job(kind, "failure", start);
                    self.metrics.record_failure(e.stage.as_str());
                    tracing::error!(stage = %e.stage, line = e.line, kind = e.source.kind(), "Job failed: {}", e.source);
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job: &Job,
        tracker: &StageTracker,
        cancel: &CancellationToken,
    ) -> std::result::Result<AudioResponse, JobError> {
        let staging = self
            .staging
            .acquire(job.id())
            .await
            .map_err(|e| JobError::new(Stage::Received, e))?;

        tracing::debug!(dir = %staging.path().display(), "Staging directory created");

        let work = async {
            match job {
                Job::Single { id, line } => self.run_single(id, line, &staging, tracker, cancel).await,
                Job::Batch { id, lines } => self.run_batch(id, lines, &staging, tracker, cancel).await,
            }
        };

        // The job deadline covers the work only; cleanup always runs after it.
        let result = match self.job_timeout {
            Some(after) => tokio::time::timeout(after, work).await.unwrap_or_else(|_| {
                Err(JobError::new(
                    tracker.current(),
                    PipelineError::Timeout { operation: "job", after },
                ))
            }),
            None => work.await,
        };

        tracker.enter(Stage::CleaningUp);
        staging.cleanup(result.is_ok()).await;

        result
    }

    async fn run_single(
        &self,
        id: &JobId,
        line: &DialogueLine,
        staging: &JobStaging,
        tracker: &StageTracker,
        cancel: &CancellationToken,
    ) -> std::result::Result<AudioResponse, JobError> {
        let staged = self.lines.process(line, staging, tracker, cancel).await?;
        self.metrics.record_line();

        tracker.enter(Stage::Uploading);
        let uploaded = self
            .upload(&staged.path, &format!("{}_{id}.wav", staged.speaker), cancel)
            .await
            .map_err(|e| JobError::new(Stage::Uploading, e))?;

        Ok(AudioResponse {
            success: true,
            file_url: uploaded.file_url,
            individual_urls: None,
        })
    }

    async fn run_batch(
        &self,
        id: &JobId,
        lines: &[DialogueLine],
        staging: &JobStaging,
        tracker: &StageTracker,
        cancel: &CancellationToken,
    ) -> std::result::Result<AudioResponse, JobError> {
        // Futures are lazy, so building them up front starts nothing. `buffered`
        // yields in input order however many lines are in flight, and
        // `try_collect` stops at the first failed line.
        let pending: Vec<_> = lines
            .iter()
            .map(|line| self.stage_line(line, staging, tracker, cancel))
            .collect();

        let staged: Vec<StagedAudioFile> = futures::stream::iter(pending)
            .buffered(self.max_concurrent_lines)
            .try_collect()
            .await?;

        tracing::debug!(
            lines = staged.len(),
            bytes = staged.iter().map(|f| f.byte_size).sum::<u64>(),
            "Lines staged"
        );

        tracker.enter(Stage::Assembling);
        let combined = self
            .assembler
            .combine(&staged, id, staging, cancel)
            .await
            .map_err(|e| JobError::new(Stage::Assembling, e))?;

        tracing::info!(lines = combined.line_count, bytes = combined.byte_size, "Dialogue assembled");

        tracker.enter(Stage::Uploading);
        let uploaded = self
            .upload(&combined.path, &format!("{id}.wav"), cancel)
            .await
            .map_err(|e| JobError::new(Stage::Uploading, e))?;

        let mut individual_urls = Vec::new();

        if self.upload_individual_lines {
            for (file, name) in staged.iter().zip(line_upload_names(&staged)) {
                let line_upload = self
                    .upload(&file.path, &name, cancel)
                    .await
                    .map_err(|e| JobError::at_line(Stage::Uploading, file.sequence, e))?;
                individual_urls.push(line_upload.file_url);
            }
        }

        Ok(AudioResponse {
            success: true,
            file_url: uploaded.file_url,
            individual_urls: Some(individual_urls),
        })
    }

    async fn stage_line(
        &self,
        line: &DialogueLine,
        staging: &JobStaging,
        tracker: &StageTracker,
        cancel: &CancellationToken,
    ) -> std::result::Result<StagedAudioFile, JobError> {
        let staged = self.lines.process(line, staging, tracker, cancel).await?;
        self.metrics.record_line();
        Ok(staged)
    }

    async fn upload(&self, path: &Path, file_name: &str, cancel: &CancellationToken) -> Result<UploadResult> {
        let uploaded = deadline::guard(
            "upload",
            self.upload_timeout,
            cancel,
            self.store.upload(path, file_name, WAV_CONTENT_TYPE),
        )
        .await?;

        tracing::info!(
            file_name,
            url = %uploaded.file_url,
            path = uploaded.file_path.as_deref(),
            store = self.store.name(),
            "Uploaded"
        );

        Ok(uploaded)
    }
}

/// `<speaker>_<n>.wav`, where `n` counts that speaker's lines from 1
fn line_upload_names(files: &[StagedAudioFile]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();

    files
        .iter()
        .map(|file| {
            let n = counts.entry(file.speaker.as_str()).or_default();
            *n += 1;
            format!("{}_{n}.wav", file.speaker)
        })
        .collect()
}

/// Builder for constructing the pipeline from configuration
pub struct PipelineBuilder<'a> {
    config: &'a Config,
}

impl<'a> PipelineBuilder<'a> {
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<Pipeline> {
        let config = self.config;

        let synthesis_timeout = config.synthesis.timeout().map_err(config_error)?;
        let upload_timeout = config.storage.timeout().map_err(config_error)?;
        let encoder_timeout = config.encoder.timeout().map_err(config_error)?;
        let job_timeout = config.pipeline.job_timeout().map_err(config_error)?;

        if config.pipeline.max_concurrent_lines == 0 {
            return Err(PipelineError::Config(
                "pipeline.max_concurrent_lines must be at least 1".to_owned(),
            ));
        }

        let client = http_client(CONNECT_TIMEOUT)?;

        let synthesizer: Arc<dyn SynthesisProvider> = match config.synthesis.provider_type {
            SynthesisProviderType::Cartesia => Arc::new(CartesiaProvider::new(client.clone(), &config.synthesis)),
        };

        let store: Arc<dyn ObjectStore> = match config.storage.storage_type {
            StorageType::Bytescale => Arc::new(BytescaleStore::new(client, &config.storage)),
        };

        let transcoder = transcoder::from_config(&config.encoder);

        tracing::debug!(
            synthesis = synthesizer.name(),
            storage = store.name(),
            transcoder = transcoder.name(),
            speakers = config.speakers.len(),
            "Pipeline initialized"
        );

        let lines = LineProcessor::new(
            SpeakerResolver::new(&config.speakers),
            synthesizer,
            AudioEncoder::new(Arc::clone(&transcoder), encoder_timeout),
            AudioFormat::from_config(&config.synthesis),
            synthesis_timeout,
        );

        Ok(Pipeline {
            lines,
            assembler: Assembler::new(transcoder, encoder_timeout),
            store,
            staging: StagingArea::new(&config.staging),
            upload_timeout,
            max_concurrent_lines: config.pipeline.max_concurrent_lines,
            upload_individual_lines: config.pipeline.upload_individual_lines,
            job_timeout,
            metrics: PipelineMetrics::new(),
        })
    }
}

fn config_error(err: anyhow::Error) -> PipelineError {
    PipelineError::Config(format!("{err:#}"))
}
