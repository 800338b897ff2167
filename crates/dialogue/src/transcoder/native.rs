use std::path::{Path, PathBuf};

use async_trait::async_trait;
use duet_config::SampleEncoding;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::{
    audio::AudioFormat,
    error::{PipelineError, Result},
};

use super::{ConcatPlan, Transcoder};

/// In-process transcoder writing WAV with `hound`
///
/// Needs no external executable. Work runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTranscoder;

#[async_trait]
impl Transcoder for NativeTranscoder {
    async fn encode(&self, raw: &Path, wav: &Path, format: AudioFormat) -> Result<()> {
        let raw = raw.to_path_buf();
        let wav = wav.to_path_buf();

        tokio::task::spawn_blocking(move || encode_blocking(&raw, &wav, format))
            .await
            .map_err(|e| PipelineError::EncodingFailed(format!("encoder task failed: {e}")))?
            .map_err(PipelineError::EncodingFailed)
    }

    async fn concat(&self, plan: &ConcatPlan) -> Result<()> {
        let inputs = plan.inputs.clone();
        let output = plan.output.clone();

        tokio::task::spawn_blocking(move || concat_blocking(&inputs, &output))
            .await
            .map_err(|e| PipelineError::AssemblyFailed(format!("concat task failed: {e}")))?
            .map_err(PipelineError::AssemblyFailed)
    }

    fn name(&self) -> &str {
        "native"
    }
}

const fn wav_spec(format: AudioFormat) -> WavSpec {
    match format.encoding {
        SampleEncoding::PcmF32le => WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
        SampleEncoding::PcmS16le => WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    }
}

fn encode_blocking(raw: &Path, wav: &Path, format: AudioFormat) -> std::result::Result<(), String> {
    let bytes = std::fs::read(raw).map_err(|e| format!("failed to read {}: {e}", raw.display()))?;

    if bytes.is_empty() {
        return Err("no samples to encode".to_owned());
    }

    if bytes.len() % format.frame_size() != 0 {
        return Err(format!(
            "{} bytes is not a whole number of {}-byte frames",
            bytes.len(),
            format.frame_size()
        ));
    }

    let mut writer = WavWriter::create(wav, wav_spec(format)).map_err(|e| e.to_string())?;

    match format.encoding {
        SampleEncoding::PcmF32le => {
            for chunk in bytes.chunks_exact(4) {
                let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                writer.write_sample(sample).map_err(|e| e.to_string())?;
            }
        }
        SampleEncoding::PcmS16le => {
            for chunk in bytes.chunks_exact(2) {
                let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
                writer.write_sample(sample).map_err(|e| e.to_string())?;
            }
        }
    }

    writer.finalize().map_err(|e| e.to_string())
}

fn concat_blocking(inputs: &[PathBuf], output: &Path) -> std::result::Result<(), String> {
    let Some(first) = inputs.first() else {
        return Err("nothing to concatenate".to_owned());
    };

    let spec = WavReader::open(first)
        .map_err(|e| format!("{}: {e}", first.display()))?
        .spec();

    let mut writer = WavWriter::create(output, spec).map_err(|e| e.to_string())?;

    for input in inputs {
        let reader = WavReader::open(input).map_err(|e| format!("{}: {e}", input.display()))?;

        if reader.spec() != spec {
            return Err(format!(
                "{} has format {:?}, expected {spec:?}",
                input.display(),
                reader.spec()
            ));
        }

        match spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.into_samples::<f32>() {
                    let sample = sample.map_err(|e| format!("{}: {e}", input.display()))?;
                    writer.write_sample(sample).map_err(|e| e.to_string())?;
                }
            }
            SampleFormat::Int => {
                for sample in reader.into_samples::<i32>() {
                    let sample = sample.map_err(|e| format!("{}: {e}", input.display()))?;
                    writer.write_sample(sample).map_err(|e| e.to_string())?;
                }
            }
        }
    }

    writer.finalize().map_err(|e| e.to_string())
}
