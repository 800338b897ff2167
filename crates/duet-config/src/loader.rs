use std::{collections::HashSet, path::Path, time::Duration};

use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if speakers, credentials, audio parameters or
    /// durations are invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_speakers()?;
        self.validate_credentials()?;
        self.validate_audio()?;
        self.validate_pipeline()?;
        self.validate_telemetry()?;
        Ok(())
    }

    /// Every speaker needs a name and its own voice
    fn validate_speakers(&self) -> anyhow::Result<()> {
        if self.speakers.is_empty() {
            anyhow::bail!("at least one speaker must be configured under [speakers]");
        }

        let mut voices = HashSet::new();

        for (key, speaker) in &self.speakers {
            if key.trim().is_empty() || speaker.name.trim().is_empty() {
                anyhow::bail!("speaker '{key}' must have a non-empty key and name");
            }

            if speaker.voice_id.trim().is_empty() {
                anyhow::bail!("speaker '{key}' must have a voice_id");
            }

            if !voices.insert(speaker.voice_id.as_str()) {
                anyhow::bail!("speaker '{key}' reuses voice_id '{}'", speaker.voice_id);
            }
        }

        Ok(())
    }

    fn validate_credentials(&self) -> anyhow::Result<()> {
        if self.synthesis.api_key.expose_secret().is_empty() {
            anyhow::bail!("synthesis.api_key must not be empty");
        }

        if self.storage.api_key.expose_secret().is_empty() {
            anyhow::bail!("storage.api_key must not be empty");
        }

        if self.storage.account_id.trim().is_empty() {
            anyhow::bail!("storage.account_id must not be empty");
        }

        Ok(())
    }

    /// Synthesis output and encoder input share these parameters
    fn validate_audio(&self) -> anyhow::Result<()> {
        if self.synthesis.sample_rate == 0 {
            anyhow::bail!("synthesis.sample_rate must be greater than 0");
        }

        if !(1..=2).contains(&self.synthesis.channels) {
            anyhow::bail!("synthesis.channels must be 1 or 2");
        }

        self.synthesis.timeout()?;
        self.encoder.timeout()?;

        Ok(())
    }

    fn validate_pipeline(&self) -> anyhow::Result<()> {
        if self.pipeline.max_concurrent_lines == 0 {
            anyhow::bail!("pipeline.max_concurrent_lines must be at least 1");
        }

        self.pipeline.job_timeout()?;
        self.storage.timeout()?;

        Ok(())
    }

    fn validate_telemetry(&self) -> anyhow::Result<()> {
        let Some(telemetry) = &self.telemetry else {
            return Ok(());
        };

        if !(0.0..=1.0).contains(&telemetry.sampling_rate) {
            anyhow::bail!("telemetry.sampling_rate must be between 0.0 and 1.0");
        }

        if let Some(exporter) = &telemetry.exporter {
            exporter.metrics_interval()?;
        }

        Ok(())
    }
}

/// Parse a human duration such as `"30s"` or `"10m"`
pub(crate) fn parse_duration(field: &str, raw: &str) -> anyhow::Result<Duration> {
    let duration = duration_str::parse(raw).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{raw}': {e}"))?;

    if duration.is_zero() {
        anyhow::bail!("{field} must be greater than zero");
    }

    Ok(duration)
}
