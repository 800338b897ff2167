//! Mock Bytescale binary upload backend
//!
//! Stores every upload in memory. Like the real service, a second upload
//! under an existing name is given a fresh URL instead of replacing the
//! first.

use std::{
    collections::HashSet,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// One stored upload
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub folder_path: Option<String>,
    pub file_url: String,
    pub body: Vec<u8>,
}

/// Mock object storage backend
pub struct MockBytescale {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockBytescaleState>,
}

#[derive(Default)]
struct MockBytescaleState {
    uploads: Mutex<Vec<Upload>>,
    reject_with: Mutex<Option<u16>>,
}

impl MockBytescale {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockBytescaleState::default());

        let app = Router::new()
            .route("/v2/accounts/{account_id}/uploads/binary", routing::post(handle_upload))
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

    /// Reject every following upload with `status`
    pub fn reject_with(&self, status: u16) {
        *self.state.reject_with.lock().unwrap() = Some(status);
    }

    /// Uploads in the order they were received
    pub fn uploads(&self) -> Vec<Upload> {
        self.state.uploads.lock().unwrap().clone()
    }
}

impl Drop for MockBytescale {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadQuery {
    file_name: String,
    folder_path: Option<String>,
}

async fn handle_upload(
    State(state): State<Arc<MockBytescaleState>>,
    Path(account_id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer "));

    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    }

    let rejection = *state.reject_with.lock().unwrap();
    if let Some(status) = rejection {
        return (StatusCode::from_u16(status).unwrap(), "upload rejected").into_response();
    }

    let mut uploads = state.uploads.lock().unwrap();

    let folder = query.folder_path.as_deref().unwrap_or("").trim_matches('/');
    let path = if folder.is_empty() {
        format!("/{}", query.file_name)
    } else {
        format!("/{folder}/{}", query.file_name)
    };

    let taken: HashSet<&str> = uploads.iter().map(|u| u.file_url.as_str()).collect();
    let mut file_path = path.clone();
    let mut attempt = 1;
    while taken.contains(format!("https://upcdn.test/{account_id}/raw{file_path}").as_str()) {
        let (stem, ext) = path.rsplit_once('.').unwrap_or((path.as_str(), ""));
        file_path = format!("{stem}_{attempt}.{ext}");
        attempt += 1;
    }
    let file_url = format!("https://upcdn.test/{account_id}/raw{file_path}");

    uploads.push(Upload {
        file_name: query.file_name,
        folder_path: query.folder_path,
        file_url: file_url.clone(),
        body: body.to_vec(),
    });

    Json(serde_json::json!({
        "fileUrl": file_url,
        "filePath": file_path,
    }))
    .into_response()
}
