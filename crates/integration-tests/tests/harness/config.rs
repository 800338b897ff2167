//! Programmatic configuration builder for integration tests

use std::{net::SocketAddr, path::Path};

use duet_config::{
    Config, EncoderBackend, EncoderConfig, HealthConfig, PipelineConfig, SampleEncoding, ServerConfig,
    SpeakerConfig, StagingConfig, StorageConfig, StorageType, SynthesisConfig, SynthesisProviderType,
};
use secrecy::SecretString;

pub const SAMPLE_RATE: u32 = 8_000;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Two speakers, native encoder, 16-bit mono at 8 kHz
    pub fn new(cartesia_url: &str, bytescale_url: &str, staging: &Path) -> Self {
        let mut config = Config {
            server: ServerConfig {
                listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                health: HealthConfig::default(),
            },
            synthesis: SynthesisConfig {
                provider_type: SynthesisProviderType::Cartesia,
                api_key: SecretString::from("sk_test_cartesia"),
                base_url: Some(cartesia_url.parse().expect("valid URL")),
                api_version: "2024-06-10".to_owned(),
                model_id: "sonic-multilingual".to_owned(),
                language: "fr".to_owned(),
                sample_rate: SAMPLE_RATE,
                encoding: SampleEncoding::PcmS16le,
                channels: 1,
                timeout: "10s".to_owned(),
            },
            storage: StorageConfig {
                storage_type: StorageType::Bytescale,
                api_key: SecretString::from("public_test_bytescale"),
                account_id: "acc123".to_owned(),
                base_url: Some(bytescale_url.parse().expect("valid URL")),
                folder_path: None,
                timeout: "10s".to_owned(),
            },
            speakers: Default::default(),
            staging: StagingConfig {
                directory: staging.to_path_buf(),
                keep_failed: false,
            },
            encoder: EncoderConfig {
                backend: EncoderBackend::Native,
                ..EncoderConfig::default()
            },
            pipeline: PipelineConfig::default(),
            telemetry: None,
        };

        for (key, name) in [("leo", "Léo"), ("romy", "Romy")] {
            config.speakers.insert(
                key.to_owned(),
                SpeakerConfig {
                    name: name.to_owned(),
                    voice_id: format!("voice-{key}"),
                },
            );
        }

        Self { config }
    }

    /// Lines of one job synthesized at the same time
    pub fn with_concurrency(mut self, lines: usize) -> Self {
        self.config.pipeline.max_concurrent_lines = lines;
        self
    }

    /// Skip per-line uploads of batch jobs
    pub fn without_line_uploads(mut self) -> Self {
        self.config.pipeline.upload_individual_lines = false;
        self
    }

    /// Place uploads in a folder
    pub fn with_folder(mut self, folder: &str) -> Self {
        self.config.storage.folder_path = Some(folder.to_owned());
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config.validate().expect("valid test config");
        self.config
    }
}
