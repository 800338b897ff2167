use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Duet dialogue audio service
#[derive(Debug, Parser)]
#[command(name = "duet", about = "Turns scripted two-voice dialogue into uploaded audio")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "duet.toml", env = "DUET_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "DUET_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,

    /// Log filter, e.g. `info` or `dialogue=debug` (`RUST_LOG` takes precedence)
    #[arg(long, default_value = "info", env = "DUET_LOG_LEVEL")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "DUET_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl From<LogFormat> for duet_telemetry::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Text => Self::Text,
            LogFormat::Json => Self::Json,
        }
    }
}
