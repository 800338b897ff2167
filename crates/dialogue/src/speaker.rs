use duet_config::SpeakerConfig;
use indexmap::IndexMap;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::error::{PipelineError, Result};

/// Voice chosen for a speaker label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpeaker {
    /// Filename-safe speaker key, e.g. `leo`
    pub slug: String,
    pub voice_id: String,
}

#[derive(Debug, Clone)]
struct Entry {
    patterns: Vec<String>,
    resolved: ResolvedSpeaker,
}

/// Maps free-form speaker labels onto configured voices
///
/// Labels and speaker names are compared after lowercasing and stripping
/// diacritics, and a label matches when it contains the speaker key or
/// display name. Entries are tried in configuration order.
#[derive(Debug, Clone)]
pub struct SpeakerResolver {
    entries: Vec<Entry>,
}

impl SpeakerResolver {
    pub fn new(speakers: &IndexMap<String, SpeakerConfig>) -> Self {
        let entries = speakers
            .iter()
            .map(|(key, speaker)| {
                let mut patterns = vec![normalize(key)];
                let name = normalize(&speaker.name);
                if !patterns.contains(&name) {
                    patterns.push(name);
                }
                patterns.retain(|p| !p.is_empty());

                Entry {
                    patterns,
                    resolved: ResolvedSpeaker {
                        slug: slugify(key),
                        voice_id: speaker.voice_id.clone(),
                    },
                }
            })
            .collect();

        Self { entries }
    }

    /// Resolve a label to its voice
    ///
    /// # Errors
    ///
    /// Returns `UnknownSpeaker` when no configured speaker matches
    pub fn resolve(&self, label: &str) -> Result<&ResolvedSpeaker> {
        let normalized = normalize(label);

        if normalized.is_empty() {
            return Err(PipelineError::UnknownSpeaker(label.to_owned()));
        }

        self.entries
            .iter()
            .find(|entry| entry.patterns.iter().any(|p| normalized.contains(p.as_str())))
            .map(|entry| &entry.resolved)
            .ok_or_else(|| PipelineError::UnknownSpeaker(label.trim().to_owned()))
    }
}

/// Lowercase, strip combining marks and surrounding whitespace
fn normalize(value: &str) -> String {
    value
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn slugify(key: &str) -> String {
    normalize(key)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
