use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::{PipelineError, Result};

use super::{SynthesisProvider, SynthesisRequest};

const DEFAULT_CARTESIA_API_URL: &str = "https://api.cartesia.ai";

/// Cartesia `/tts/bytes` client
pub struct CartesiaProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    api_version: String,
    model_id: String,
    language: String,
}

impl CartesiaProvider {
    pub fn new(client: Client, config: &duet_config::SynthesisConfig) -> Self {
        let base_url = config
            .base_url
            .as_ref()
            .map_or(DEFAULT_CARTESIA_API_URL, url::Url::as_str)
            .trim_end_matches('/')
            .to_owned();

        Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            model_id: config.model_id.clone(),
            language: config.language.clone(),
        }
    }
}

#[derive(Serialize)]
struct CartesiaRequest<'a> {
    transcript: &'a str,
    model_id: &'a str,
    voice: VoiceSelector<'a>,
    output_format: OutputFormat,
    language: &'a str,
}

#[derive(Serialize)]
struct VoiceSelector<'a> {
    mode: &'static str,
    id: &'a str,
}

#[derive(Serialize)]
struct OutputFormat {
    container: &'static str,
    encoding: &'static str,
    sample_rate: u32,
}

#[async_trait]
impl SynthesisProvider for CartesiaProvider {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>> {
        if request.text.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("text must not be empty".to_owned()));
        }

        let url = format!("{}/tts/bytes", self.base_url);

        tracing::debug!(
            voice = request.voice_id,
            input_len = request.text.len(),
            sample_rate = request.format.sample_rate,
            "Cartesia synthesis request"
        );

        let body = CartesiaRequest {
            transcript: request.text,
            model_id: &self.model_id,
            voice: VoiceSelector {
                mode: "id",
                id: request.voice_id,
            },
            output_format: OutputFormat {
                container: "raw",
                encoding: request.format.encoding.as_str(),
                sample_rate: request.format.sample_rate,
            },
            language: &self.language,
        };

        let response = self
            .client
            .post(&url)
            .header("X-API-Key", self.api_key.expose_secret())
            .header("Cartesia-Version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Cartesia request failed: {e}");
                PipelineError::Connection {
                    service: "synthesis",
                    message: e.to_string(),
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!("Cartesia API error ({status}): {error_text}");

            return Err(PipelineError::SynthesisFailed {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let audio = response.bytes().await.map_err(|e| PipelineError::Connection {
            service: "synthesis",
            message: format!("failed to read audio body: {e}"),
        })?;

        if audio.is_empty() {
            return Err(PipelineError::SynthesisFailed {
                status: status.as_u16(),
                message: "service returned no audio".to_owned(),
            });
        }

        tracing::debug!("Cartesia synthesis complete, {} bytes", audio.len());

        Ok(audio.to_vec())
    }

    fn name(&self) -> &str {
        "cartesia"
    }
}
