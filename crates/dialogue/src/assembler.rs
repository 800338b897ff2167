use std::{fmt::Write as _, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    audio::{CombinedAudioFile, StagedAudioFile},
    deadline,
    error::{PipelineError, Result},
    staging::JobStaging,
    transcoder::{ConcatPlan, Transcoder},
    types::JobId,
};

const MANIFEST_NAME: &str = "concat.txt";

/// Joins the staged lines of a batch into one file
pub struct Assembler {
    transcoder: Arc<dyn Transcoder>,
    timeout: Duration,
}

impl Assembler {
    pub fn new(transcoder: Arc<dyn Transcoder>, timeout: Duration) -> Self {
        Self { transcoder, timeout }
    }

    /// Concatenate `files` in the given order into `<job_id>.wav`
    ///
    /// The input order is the script order. Nothing is sorted; out of order
    /// or duplicated sequence numbers are rejected.
    pub(crate) async fn combine(
        &self,
        files: &[StagedAudioFile],
        job_id: &JobId,
        staging: &JobStaging,
        cancel: &CancellationToken,
    ) -> Result<CombinedAudioFile> {
        if files.is_empty() {
            return Err(PipelineError::AssemblyFailed("no staged files to combine".to_owned()));
        }

        if let Some(pair) = files.windows(2).find(|pair| pair[0].sequence >= pair[1].sequence) {
            return Err(PipelineError::AssemblyFailed(format!(
                "line {} staged after line {}",
                pair[1].sequence, pair[0].sequence
            )));
        }

        let manifest = staging.file(MANIFEST_NAME);
        tokio::fs::write(&manifest, manifest_contents(files)?)
            .await
            .map_err(|e| PipelineError::io(format_args!("failed to write {}", manifest.display()), &e))?;

        let plan = ConcatPlan {
            manifest,
            inputs: files.iter().map(|f| f.path.clone()).collect(),
            output: staging.file(&format!("{job_id}.wav")),
        };

        tracing::debug!(lines = files.len(), output = %plan.output.display(), "Assembling");

        deadline::guard("assembly", self.timeout, cancel, self.transcoder.concat(&plan)).await?;

        let byte_size = tokio::fs::metadata(&plan.output)
            .await
            .map_err(|e| PipelineError::AssemblyFailed(format!("no combined output: {e}")))?
            .len();

        Ok(CombinedAudioFile {
            path: plan.output,
            line_count: files.len(),
            byte_size,
        })
    }
}

/// Concat demuxer listing, one `file '<name>'` entry per line
///
/// Entries are bare file names; the demuxer resolves them against the
/// manifest's own directory, which is where lines are staged.
fn manifest_contents(files: &[StagedAudioFile]) -> Result<String> {
    let mut contents = String::new();

    for file in files {
        let name = file
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PipelineError::AssemblyFailed(format!("unusable staged path {}", file.path.display())))?;

        let _ = writeln!(contents, "file '{}'", name.replace('\'', r"'\''"));
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use duet_config::{SampleEncoding, StagingConfig};

    use super::*;
    use crate::{
        audio::AudioFormat, staging::StagingArea, test_support::StalledTranscoder, transcoder::native::NativeTranscoder,
    };

    const FORMAT: AudioFormat = AudioFormat {
        sample_rate: 1_000,
        channels: 1,
        encoding: SampleEncoding::PcmS16le,
    };

    fn staged(path: PathBuf, sequence: usize) -> StagedAudioFile {
        StagedAudioFile {
            path,
            sequence,
            speaker: "leo".into(),
            byte_size: 0,
        }
    }

    async fn job_staging(root: &Path) -> JobStaging {
        StagingArea::new(&StagingConfig {
            directory: root.to_path_buf(),
            keep_failed: false,
        })
        .acquire(&JobId::parse("topic_1").unwrap())
        .await
        .unwrap()
    }

    async fn line_of(staging: &JobStaging, sequence: usize, frames: usize) -> StagedAudioFile {
        let (raw, wav) = staging.line_paths(sequence, "leo");
        let value = i16::try_from(sequence).unwrap();
        let samples: Vec<u8> = std::iter::repeat_n(value, frames).flat_map(i16::to_le_bytes).collect();
        std::fs::write(&raw, samples).unwrap();
        NativeTranscoder.encode(&raw, &wav, FORMAT).await.unwrap();
        staged(wav, sequence)
    }

    fn assembler() -> Assembler {
        Assembler::new(Arc::new(NativeTranscoder), Duration::from_secs(5))
    }

    #[test]
    fn manifest_escapes_quotes() {
        let contents = manifest_contents(&[
            staged(PathBuf::from("/tmp/job/1_leo_ab.wav"), 1),
            staged(PathBuf::from("/tmp/job/2_l'eo_cd.wav"), 2),
        ])
        .unwrap();

        assert_eq!(contents, "file '1_leo_ab.wav'\nfile '2_l'\\''eo_cd.wav'\n");
    }

    #[tokio::test]
    async fn combines_in_script_order() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = job_staging(tmp.path()).await;
        let files = vec![
            line_of(&staging, 1, 100).await,
            line_of(&staging, 2, 250).await,
            line_of(&staging, 3, 50).await,
        ];

        let combined = assembler()
            .combine(&files, &JobId::parse("topic_1").unwrap(), &staging, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(combined.line_count, 3);
        assert_eq!(combined.path.file_name().unwrap(), "topic_1.wav");
        assert!(staging.file(MANIFEST_NAME).exists());

        let mut reader = hound::WavReader::open(&combined.path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 400);
        assert!(samples[..100].iter().all(|s| *s == 1));
        assert!(samples[100..350].iter().all(|s| *s == 2));
        assert!(samples[350..].iter().all(|s| *s == 3));
    }

    #[tokio::test]
    async fn empty_input_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = job_staging(tmp.path()).await;

        let err = assembler()
            .combine(&[], &JobId::parse("topic_1").unwrap(), &staging, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::AssemblyFailed(_)));
    }

    #[tokio::test]
    async fn out_of_order_input_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = job_staging(tmp.path()).await;
        let files = vec![line_of(&staging, 2, 10).await, line_of(&staging, 1, 10).await];

        let err = assembler()
            .combine(&files, &JobId::parse("topic_1").unwrap(), &staging, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::AssemblyFailed(ref msg) if msg.contains("line 1 staged after line 2")));
    }

    #[tokio::test]
    async fn hung_concat_hits_the_assembly_deadline() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = job_staging(tmp.path()).await;
        let files = vec![line_of(&staging, 1, 10).await, line_of(&staging, 2, 10).await];
        let assembler = Assembler::new(Arc::new(StalledTranscoder), Duration::from_millis(50));

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            assembler.combine(&files, &JobId::parse("topic_1").unwrap(), &staging, &CancellationToken::new()),
        )
        .await
        .expect("assembly deadline did not fire")
        .unwrap_err();

        assert!(matches!(err, PipelineError::Timeout { operation: "assembly", .. }));
        assert!(!staging.file("topic_1.wav").exists());
    }
}
