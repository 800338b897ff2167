//! Mock Cartesia `/tts/bytes` backend
//!
//! Every transcript is answered with a deterministic tone: one 16-bit
//! sample per frame, `20 * chars` frames long, with every sample set to the
//! transcript's character count. Segment boundaries and order can then be
//! read back from the assembled WAV.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub const FRAMES_PER_CHAR: usize = 20;

/// Mock synthesis backend
pub struct MockCartesia {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockCartesiaState>,
}

#[derive(Default)]
struct MockCartesiaState {
    request_count: AtomicU32,
    voices: Mutex<Vec<String>>,
    failing: Mutex<HashMap<String, u16>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl MockCartesia {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockCartesiaState::default());

        let app = Router::new()
            .route("/tts/bytes", routing::post(handle_tts_bytes))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer `transcript` with `status` instead of audio
    pub fn fail_on(&self, transcript: &str, status: u16) {
        self.state
            .failing
            .lock()
            .unwrap()
            .insert(transcript.to_owned(), status);
    }

    /// Hold the answer to `transcript` back for `delay`
    pub fn delay_on(&self, transcript: &str, delay: Duration) {
        self.state
            .delays
            .lock()
            .unwrap()
            .insert(transcript.to_owned(), delay);
    }

    /// Number of synthesis requests received
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// Voice ids in the order they were requested
    pub fn voices(&self) -> Vec<String> {
        self.state.voices.lock().unwrap().clone()
    }
}

impl Drop for MockCartesia {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Samples the mock produces for `transcript`
pub fn tone(transcript: &str) -> Vec<i16> {
    let chars = transcript.chars().count();
    vec![i16::try_from(chars).unwrap(); chars * FRAMES_PER_CHAR]
}

#[derive(Debug, Deserialize)]
struct TtsRequest {
    transcript: String,
    voice: Voice,
    output_format: OutputFormat,
}

#[derive(Debug, Deserialize)]
struct Voice {
    mode: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct OutputFormat {
    container: String,
    encoding: String,
}

async fn handle_tts_bytes(
    State(state): State<Arc<MockCartesiaState>>,
    headers: HeaderMap,
    Json(request): Json<TtsRequest>,
) -> Response {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    if headers.get("x-api-key").is_none() || headers.get("cartesia-version").is_none() {
        return (StatusCode::UNAUTHORIZED, "missing credentials").into_response();
    }

    if request.voice.mode != "id" || request.output_format.container != "raw" {
        return (StatusCode::BAD_REQUEST, "unsupported request").into_response();
    }

    state.voices.lock().unwrap().push(request.voice.id.clone());

    let delay = state.delays.lock().unwrap().get(&request.transcript).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let failure = state.failing.lock().unwrap().get(&request.transcript).copied();
    if let Some(status) = failure {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, "voice unavailable").into_response();
    }

    let samples = tone(&request.transcript);
    let body: Vec<u8> = match request.output_format.encoding.as_str() {
        "pcm_s16le" => samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
        "pcm_f32le" => samples
            .iter()
            .flat_map(|s| (f32::from(*s) / f32::from(i16::MAX)).to_le_bytes())
            .collect(),
        other => return (StatusCode::BAD_REQUEST, format!("unsupported encoding {other}")).into_response(),
    };

    (StatusCode::OK, body).into_response()
}
