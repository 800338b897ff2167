use std::{collections::HashMap, time::Duration};

use serde::Deserialize;
use url::Url;

/// OpenTelemetry export of job traces and pipeline metrics
///
/// Logging is always on; this section only adds OTLP export.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `service.name` resource attribute
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Additional resource attributes
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
    /// Collector to export to; nothing is exported without it
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
    /// Fraction of job traces kept (0.0 to 1.0)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// Export job spans
    #[serde(default = "default_true")]
    pub traces: bool,
    /// Export pipeline metrics
    #[serde(default = "default_true")]
    pub metrics: bool,
}

/// OTLP collector endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub endpoint: Url,
    #[serde(default)]
    pub protocol: ExportProtocol,
    /// How often metrics are pushed (e.g. "30s")
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval: String,
}

impl ExporterConfig {
    /// Parsed metrics push interval
    ///
    /// # Errors
    ///
    /// Returns an error if the configured duration cannot be parsed
    pub fn metrics_interval(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("telemetry.exporter.metrics_interval", &self.metrics_interval)
    }
}

/// OTLP transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    #[default]
    Grpc,
    HttpProto,
}

fn default_service_name() -> String {
    "duet".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_sampling_rate() -> f64 {
    1.0
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

fn default_metrics_interval() -> String {
    "30s".to_string()
}
