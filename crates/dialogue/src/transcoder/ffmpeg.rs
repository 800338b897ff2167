use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use duet_config::SampleEncoding;
use tokio::process::Command;

use crate::{
    audio::AudioFormat,
    error::{PipelineError, Result},
};

use super::{ConcatPlan, Transcoder};

/// Transcoder backed by an external ffmpeg executable
///
/// The child is killed when the returned future is dropped, so a job
/// deadline or cancellation never leaves a process behind.
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub const fn new(program: PathBuf) -> Self {
        Self { program }
    }

    async fn run(&self, args: Vec<OsString>) -> std::result::Result<(), String> {
        tracing::debug!(program = %self.program.display(), ?args, "Running ffmpeg");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to start {}: {e}", self.program.display()))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!("ffmpeg exited with {}: {}", output.status, stderr.trim()))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn encode(&self, raw: &Path, wav: &Path, format: AudioFormat) -> Result<()> {
        self.run(encode_args(raw, wav, format))
            .await
            .map_err(PipelineError::EncodingFailed)
    }

    async fn concat(&self, plan: &ConcatPlan) -> Result<()> {
        self.run(concat_args(&plan.manifest, &plan.output))
            .await
            .map_err(PipelineError::AssemblyFailed)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// ffmpeg demuxer name for headerless samples
const fn raw_format(encoding: SampleEncoding) -> &'static str {
    match encoding {
        SampleEncoding::PcmF32le => "f32le",
        SampleEncoding::PcmS16le => "s16le",
    }
}

/// WAV codec keeping the samples as they are
const fn wav_codec(encoding: SampleEncoding) -> &'static str {
    match encoding {
        SampleEncoding::PcmF32le => "pcm_f32le",
        SampleEncoding::PcmS16le => "pcm_s16le",
    }
}

fn encode_args(raw: &Path, wav: &Path, format: AudioFormat) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-f"]
        .into_iter()
        .map(OsString::from)
        .collect();

    args.push(raw_format(format.encoding).into());
    args.push("-ar".into());
    args.push(format.sample_rate.to_string().into());
    args.push("-ac".into());
    args.push(format.channels.to_string().into());
    args.push("-i".into());
    args.push(raw.into());
    args.push("-c:a".into());
    args.push(wav_codec(format.encoding).into());
    args.push(wav.into());

    args
}

fn concat_args(manifest: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    args.push(manifest.into());
    args.push("-c".into());
    args.push("copy".into());
    args.push(output.into());

    args
}
