use std::path::Path;

use async_trait::async_trait;
use duet_config::Config;
use wiremock::{
    Mock, MockServer, Request, Respond, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

use crate::{
    audio::AudioFormat,
    error::Result,
    transcoder::{ConcatPlan, Transcoder},
};

pub(crate) const SAMPLE_RATE: u32 = 8_000;

pub(crate) fn config(synthesis: &MockServer, storage: &MockServer, staging: &Path) -> Config {
    Config::from_toml(&format!(
        r#"
        [synthesis]
        api_key = "sk_test"
        base_url = "{synthesis}"
        sample_rate = {SAMPLE_RATE}
        encoding = "pcm_s16le"

        [storage]
        api_key = "public_test"
        account_id = "acc123"
        base_url = "{storage}"

        [speakers.leo]
        name = "Léo"
        voice_id = "voice-leo"

        [speakers.romy]
        name = "Romy"
        voice_id = "voice-romy"

        [staging]
        directory = "{staging}"

        [encoder]
        backend = "native"
        "#,
        synthesis = synthesis.uri(),
        storage = storage.uri(),
        staging = staging.display(),
    ))
    .unwrap()
}

/// `frames` mono 16-bit samples all set to `value`
pub(crate) fn pcm(frames: usize, value: i16) -> Vec<u8> {
    std::iter::repeat_n(value, frames).flat_map(i16::to_le_bytes).collect()
}

/// Answer synthesis of `transcript` with `frames` samples of `value`
pub(crate) fn line_mock(transcript: &str, frames: usize, value: i16) -> Mock {
    Mock::given(method("POST"))
        .and(path("/tts/bytes"))
        .and(body_partial_json(serde_json::json!({ "transcript": transcript })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pcm(frames, value)))
}

/// Upload endpoint answering with a URL derived from `fileName`
pub(crate) fn upload_mock() -> Mock {
    Mock::given(method("POST"))
        .and(path("/v2/accounts/acc123/uploads/binary"))
        .respond_with(EchoUpload)
}

struct EchoUpload;

impl Respond for EchoUpload {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let name = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "fileName")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();

        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "fileUrl": format!("https://upcdn.test/acc123/raw/{name}"),
            "filePath": format!("/{name}"),
        }))
    }
}

/// Bodies received by the upload endpoint, keyed by `fileName`
pub(crate) async fn uploads(storage: &MockServer) -> Vec<(String, Vec<u8>)> {
    storage
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| {
            let name = request
                .url
                .query_pairs()
                .find(|(key, _)| key == "fileName")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            (name, request.body)
        })
        .collect()
}

pub(crate) fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}

/// Transcoder whose operations never finish, like a hung ffmpeg
pub(crate) struct StalledTranscoder;

#[async_trait]
impl Transcoder for StalledTranscoder {
    async fn encode(&self, _raw: &Path, _wav: &Path, _format: AudioFormat) -> Result<()> {
        std::future::pending().await
    }

    async fn concat(&self, _plan: &ConcatPlan) -> Result<()> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "stalled"
    }
}
