use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
    time::Duration,
};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure of one pipeline component
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request is missing required fields or carries invalid values
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Speaker label matches none of the configured speakers
    #[error("Unknown speaker: '{0}'")]
    UnknownSpeaker(String),

    /// Synthesis service answered with a non-success status
    #[error("Synthesis failed with status {status}: {message}")]
    SynthesisFailed { status: u16, message: String },

    /// Transcoder could not wrap raw samples into a container
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Staged files could not be concatenated
    #[error("Assembly failed: {0}")]
    AssemblyFailed(String),

    /// Object storage rejected the upload
    #[error("Upload failed with status {status}: {body}")]
    UploadFailed { status: u16, body: String },

    /// Remote service could not be reached
    #[error("Connection to {service} failed: {message}")]
    Connection { service: &'static str, message: String },

    /// Operation did not finish before its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },

    /// Job was aborted by its caller or by shutdown
    #[error("Job cancelled")]
    Cancelled,

    /// Staging filesystem error
    #[error("Staging I/O error: {0}")]
    Io(String),

    /// Pipeline could not be built from configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::UnknownSpeaker(_) => StatusCode::BAD_REQUEST,
            Self::SynthesisFailed { .. } | Self::UploadFailed { .. } | Self::Connection { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            Self::EncodingFailed(_) | Self::AssemblyFailed(_) | Self::Io(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error kind
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::UnknownSpeaker(_) => "unknown_speaker",
            Self::SynthesisFailed { .. } => "synthesis_failed",
            Self::EncodingFailed(_) => "encoding_failed",
            Self::AssemblyFailed(_) => "assembly_failed",
            Self::UploadFailed { .. } => "upload_failed",
            Self::Connection { .. } => "connection_error",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io_error",
            Self::Config(_) => "config_error",
        }
    }

    pub(crate) fn io(context: impl fmt::Display, err: &std::io::Error) -> Self {
        Self::Io(format!("{context}: {err}"))
    }
}

/// Stage of a job, used for progress logging and to locate failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Stage {
    Received,
    Resolving,
    Synthesizing,
    Encoding,
    Assembling,
    Uploading,
    CleaningUp,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Resolving => "resolving",
            Self::Synthesizing => "synthesizing",
            Self::Encoding => "encoding",
            Self::Assembling => "assembling",
            Self::Uploading => "uploading",
            Self::CleaningUp => "cleaning_up",
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Resolving,
            2 => Self::Synthesizing,
            3 => Self::Encoding,
            4 => Self::Assembling,
            5 => Self::Uploading,
            6 => Self::CleaningUp,
            _ => Self::Received,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage a running job is in, shared by its in-flight lines
#[derive(Debug)]
pub(crate) struct StageTracker(AtomicU8);

impl StageTracker {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(Stage::Received as u8))
    }

    pub(crate) fn enter(&self, stage: Stage) {
        self.0.store(stage as u8, Ordering::Relaxed);
        tracing::debug!(%stage, "Job stage");
    }

    pub(crate) fn current(&self) -> Stage {
        Stage::from_u8(self.0.load(Ordering::Relaxed))
    }
}

/// Terminal `Failed{stage, cause}` state of a job
#[derive(Debug)]
pub struct JobError {
    pub stage: Stage,
    /// 1-based script position of the failing line, if a line failed
    pub line: Option<usize>,
    pub source: PipelineError,
}

impl JobError {
    pub const fn new(stage: Stage, source: PipelineError) -> Self {
        Self {
            stage,
            line: None,
            source,
        }
    }

    pub const fn at_line(stage: Stage, line: usize, source: PipelineError) -> Self {
        Self {
            stage,
            line: Some(line),
            source,
        }
    }

    /// Reject a request before any work has started
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Stage::Received, PipelineError::InvalidRequest(message.into()))
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {line}): {}", self.stage, self.source),
            None => write!(f, "{}: {}", self.stage, self.source),
        }
    }
}

/// Error body returned to callers
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    kind: &'static str,
    stage: &'static str,
    details: String,
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let status = self.source.status_code();

        let error = if matches!(self.source, PipelineError::InvalidRequest(_)) {
            "Invalid request"
        } else {
            "Failed to generate audio"
        };

        let body = ErrorResponse {
            error,
            kind: self.source.kind(),
            stage: self.stage.as_str(),
            details: self.source.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
