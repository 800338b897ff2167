use serde::Deserialize;

/// A known speaker and the synthetic voice it is read with
///
/// The table key (e.g. `leo`) is what speaker labels are matched against;
/// `name` is the display name, which is matched as well.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeakerConfig {
    /// Display name (e.g. "Léo")
    pub name: String,
    /// Voice identifier at the synthesis service
    pub voice_id: String,
}
