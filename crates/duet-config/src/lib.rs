#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
pub mod pipeline;
pub mod server;
pub mod speaker;
pub mod storage;
pub mod synthesis;
pub mod telemetry;

use indexmap::IndexMap;
use serde::Deserialize;

pub use pipeline::*;
pub use server::*;
pub use speaker::*;
pub use storage::*;
pub use synthesis::*;
pub use telemetry::{ExportProtocol, ExporterConfig, TelemetryConfig};

pub(crate) use loader::parse_duration;

/// Top-level Duet configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Speech synthesis service
    pub synthesis: SynthesisConfig,
    /// Object storage for finished audio
    pub storage: StorageConfig,
    /// Known speakers keyed by their matching name
    #[serde(default)]
    pub speakers: IndexMap<String, SpeakerConfig>,
    /// Local staging area
    #[serde(default)]
    pub staging: StagingConfig,
    /// Transcoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// Job orchestration policy
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
