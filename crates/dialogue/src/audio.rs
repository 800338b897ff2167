use std::path::PathBuf;

use duet_config::{SampleEncoding, SynthesisConfig};

/// Parameters shared by synthesis output and encoder input
///
/// Built once from configuration; both sides read the same value so the
/// raw samples are always interpreted the way they were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
}

impl AudioFormat {
    pub const fn from_config(config: &SynthesisConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            encoding: config.encoding,
        }
    }

    /// Bytes in one frame (one sample for every channel)
    pub const fn frame_size(&self) -> usize {
        self.encoding.bytes_per_sample() * self.channels as usize
    }
}

/// Per-line WAV file in the job's staging directory
#[derive(Debug, Clone)]
pub struct StagedAudioFile {
    pub path: PathBuf,
    /// Script position of the line this audio was synthesized from
    pub sequence: usize,
    /// Filename-safe speaker key
    pub speaker: String,
    pub byte_size: u64,
}

/// All lines of a batch joined into one file
#[derive(Debug, Clone)]
pub struct CombinedAudioFile {
    pub path: PathBuf,
    pub line_count: usize,
    pub byte_size: u64,
}

/// Where an uploaded file can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub file_url: String,
    pub file_path: Option<String>,
}
