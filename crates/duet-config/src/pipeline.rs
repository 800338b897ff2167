use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Job orchestration policy
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Lines of one job that may be synthesized at the same time.
    /// Results are always assembled in script order.
    #[serde(default = "default_max_concurrent_lines")]
    pub max_concurrent_lines: usize,
    /// Upload every line of a batch next to the combined file
    #[serde(default = "default_true")]
    pub upload_individual_lines: bool,
    /// Deadline for a whole job (e.g. "10m"), unlimited when unset
    #[serde(default)]
    pub job_timeout: Option<String>,
}

impl PipelineConfig {
    /// Parsed whole-job deadline
    ///
    /// # Errors
    ///
    /// Returns an error if the configured duration cannot be parsed
    pub fn job_timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.job_timeout
            .as_deref()
            .map(|raw| crate::parse_duration("pipeline.job_timeout", raw))
            .transpose()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lines: default_max_concurrent_lines(),
            upload_individual_lines: true,
            job_timeout: None,
        }
    }
}

/// Local staging area for in-progress audio
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagingConfig {
    /// Root directory; every job gets its own subdirectory below it
    #[serde(default = "default_staging_directory")]
    pub directory: PathBuf,
    /// Keep the directory of a failed job for inspection
    #[serde(default)]
    pub keep_failed: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            directory: default_staging_directory(),
            keep_failed: false,
        }
    }
}

/// Transcoder configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderConfig {
    /// Which transcoder wraps and concatenates audio
    #[serde(default)]
    pub backend: EncoderBackend,
    /// ffmpeg executable, looked up on `PATH` when relative
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Deadline for one transcoder invocation (e.g. "30s")
    #[serde(default = "default_encoder_timeout")]
    pub timeout: String,
}

impl EncoderConfig {
    /// Parsed transcoder deadline
    ///
    /// # Errors
    ///
    /// Returns an error if the configured duration cannot be parsed
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("encoder.timeout", &self.timeout)
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            backend: EncoderBackend::default(),
            ffmpeg_path: default_ffmpeg_path(),
            timeout: default_encoder_timeout(),
        }
    }
}

/// Transcoder implementations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderBackend {
    /// External ffmpeg process
    #[default]
    Ffmpeg,
    /// In-process WAV writer
    Native,
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_concurrent_lines() -> usize {
    1
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

fn default_staging_directory() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_encoder_timeout() -> String {
    "30s".to_string()
}
