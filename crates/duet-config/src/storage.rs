use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Object storage configuration for finished audio files
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(rename = "type", default)]
    pub storage_type: StorageType,
    /// Bearer token for uploads
    pub api_key: SecretString,
    /// Account that owns the upload destination
    pub account_id: String,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Optional folder uploads are placed in
    #[serde(default)]
    pub folder_path: Option<String>,
    /// Deadline for one upload (e.g. "120s")
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

impl StorageConfig {
    /// Parsed upload deadline
    ///
    /// # Errors
    ///
    /// Returns an error if the configured duration cannot be parsed
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("storage.timeout", &self.timeout)
    }
}

/// Supported storage backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Bytescale binary upload API
    #[default]
    Bytescale,
}

fn default_timeout() -> String {
    "120s".to_string()
}
