use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Remote text-to-speech service configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisConfig {
    /// Provider type
    #[serde(rename = "type", default)]
    pub provider_type: SynthesisProviderType,
    /// API key sent with every synthesis call
    pub api_key: SecretString,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// API version header value
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Synthesis model identifier
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Spoken language of the deployment
    #[serde(default = "default_language")]
    pub language: String,
    /// Output sample rate in Hz, shared with the encoder
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Raw sample encoding, shared with the encoder
    #[serde(default)]
    pub encoding: SampleEncoding,
    /// Channel count of the synthesized audio
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Deadline for one synthesis call (e.g. "60s")
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl SynthesisConfig {
    /// Parsed synthesis call deadline
    ///
    /// # Errors
    ///
    /// Returns an error if the configured duration cannot be parsed
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("synthesis.timeout", &self.timeout)
    }
}

/// Supported synthesis providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisProviderType {
    /// Cartesia `/tts/bytes`
    #[default]
    Cartesia,
}

/// Raw PCM sample encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    /// 32-bit little-endian float
    #[default]
    PcmF32le,
    /// 16-bit little-endian signed integer
    PcmS16le,
}

impl SampleEncoding {
    /// Wire name used by the synthesis service
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PcmF32le => "pcm_f32le",
            Self::PcmS16le => "pcm_s16le",
        }
    }

    /// Size of one sample in bytes
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::PcmF32le => 4,
            Self::PcmS16le => 2,
        }
    }
}

fn default_api_version() -> String {
    "2024-06-10".to_string()
}

fn default_model_id() -> String {
    "sonic-multilingual".to_string()
}

fn default_language() -> String {
    "fr".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_sample_rate() -> u32 {
    44_100
}

#[allow(clippy::missing_const_for_fn)]
fn default_channels() -> u16 {
    1
}

fn default_timeout() -> String {
    "60s".to_string()
}
