pub mod ffmpeg;
pub mod native;

use std::{path::{Path, PathBuf}, sync::Arc};

use async_trait::async_trait;
use duet_config::{EncoderBackend, EncoderConfig};

use crate::{audio::AudioFormat, error::Result};

/// Inputs of one concatenation, in playback order
#[derive(Debug, Clone)]
pub struct ConcatPlan {
    /// ffmpeg concat demuxer listing of `inputs`
    pub manifest: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Wraps raw samples into WAV and joins WAV files
///
/// Both operations copy samples unchanged; nothing is resampled or
/// re-encoded.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Wrap headerless PCM from `raw` into a WAV container at `wav`
    async fn encode(&self, raw: &Path, wav: &Path, format: AudioFormat) -> Result<()>;

    /// Join the plan's inputs into one WAV file
    async fn concat(&self, plan: &ConcatPlan) -> Result<()>;

    /// Get the backend name
    fn name(&self) -> &str;
}

/// Build the configured transcoder
pub fn from_config(config: &EncoderConfig) -> Arc<dyn Transcoder> {
    match config.backend {
        EncoderBackend::Ffmpeg => Arc::new(ffmpeg::FfmpegTranscoder::new(config.ffmpeg_path.clone())),
        EncoderBackend::Native => Arc::new(native::NativeTranscoder),
    }
}
