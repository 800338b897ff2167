use serde::{Deserialize, Serialize};

use crate::error::JobError;

const MAX_JOB_ID_LEN: usize = 128;

/// Audio generation request
///
/// Either `{text, speaker}` for a single line, or `{dialogues, jobId}` for a
/// whole script. `topicId` is accepted in place of `jobId`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub dialogues: Option<Vec<DialogueInput>>,
    #[serde(default, alias = "topicId")]
    pub job_id: Option<String>,
}

/// One scripted line as sent by the caller
#[derive(Debug, Clone, Deserialize)]
pub struct DialogueInput {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
}

/// Successful job response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioResponse {
    pub success: bool,
    pub file_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual_urls: Option<Vec<String>>,
}

/// One utterance of the script, immutable once received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    /// 1-based position in the script
    pub sequence: usize,
    pub speaker: String,
    pub text: String,
}

/// Validated job identifier, safe to use in file and directory names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(String);

impl JobId {
    /// Validate a caller-supplied identifier
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the identifier is empty, too long, a dot
    /// path segment, or contains characters other than ASCII alphanumerics,
    /// `-`, `_` and `.`
    pub fn parse(raw: &str) -> Result<Self, JobError> {
        let id = raw.trim();

        if id.is_empty() {
            return Err(JobError::invalid_request("jobId must not be empty"));
        }

        if id.len() > MAX_JOB_ID_LEN {
            return Err(JobError::invalid_request(format!(
                "jobId must be at most {MAX_JOB_ID_LEN} characters"
            )));
        }

        if id == "." || id == ".." {
            return Err(JobError::invalid_request("jobId must not be a path segment"));
        }

        if !id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            return Err(JobError::invalid_request(format!(
                "jobId '{id}' may only contain letters, digits, '-', '_' and '.'"
            )));
        }

        Ok(Self(id.to_owned()))
    }

    /// Fresh identifier for jobs the caller did not name
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit of work accepted by the pipeline
#[derive(Debug, Clone)]
pub enum Job {
    /// One line, uploaded on its own
    Single { id: JobId, line: DialogueLine },
    /// A whole script, assembled into one file
    Batch { id: JobId, lines: Vec<DialogueLine> },
}

impl Job {
    pub const fn id(&self) -> &JobId {
        match self {
            Self::Single { id, .. } | Self::Batch { id, .. } => id,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Single { .. } => "single",
            Self::Batch { .. } => "batch",
        }
    }

    /// Lines of the job in script order
    pub fn lines(&self) -> &[DialogueLine] {
        match self {
            Self::Single { line, .. } => std::slice::from_ref(line),
            Self::Batch { lines, .. } => lines,
        }
    }

    /// Build a single-line job
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the text or speaker is blank
    pub fn single(speaker: &str, text: &str) -> Result<Self, JobError> {
        let line = validated_line(1, speaker, text)
            .map_err(|()| JobError::invalid_request("Text or speaker not provided"))?;

        Ok(Self::Single {
            id: JobId::generate("line"),
            line,
        })
    }

    /// Build a batch job, numbering lines by their position
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the job id is invalid, the script is
    /// empty, or any line has a blank text or speaker
    pub fn batch(job_id: &str, dialogues: &[DialogueInput]) -> Result<Self, JobError> {
        let id = JobId::parse(job_id)?;

        if dialogues.is_empty() {
            return Err(JobError::invalid_request("dialogues must contain at least one line"));
        }

        let lines = dialogues
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let sequence = index + 1;
                validated_line(sequence, &input.speaker, &input.text).map_err(|()| {
                    JobError::invalid_request(format!("dialogue line {sequence} is missing its text or speaker"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::Batch { id, lines })
    }
}

impl TryFrom<AudioRequest> for Job {
    type Error = JobError;

    fn try_from(request: AudioRequest) -> Result<Self, Self::Error> {
        match request.dialogues {
            Some(dialogues) => {
                let job_id = request
                    .job_id
                    .ok_or_else(|| JobError::invalid_request("jobId is required with dialogues"))?;
                Self::batch(&job_id, &dialogues)
            }
            None => Self::single(
                request.speaker.as_deref().unwrap_or_default(),
                request.text.as_deref().unwrap_or_default(),
            ),
        }
    }
}

fn validated_line(sequence: usize, speaker: &str, text: &str) -> Result<DialogueLine, ()> {
    if speaker.trim().is_empty() || text.trim().is_empty() {
        return Err(());
    }

    Ok(DialogueLine {
        sequence,
        speaker: speaker.to_owned(),
        text: text.to_owned(),
    })
}
