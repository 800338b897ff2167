pub mod cartesia;

use async_trait::async_trait;

use crate::{audio::AudioFormat, error::Result};

/// Text and voice for one synthesis call
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub format: AudioFormat,
}

/// Remote text-to-speech service
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Synthesize one line into raw PCM samples in `request.format`
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>>;

    /// Get the provider name
    fn name(&self) -> &str;
}
