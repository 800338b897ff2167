use std::time::Duration;

use axum::http;
use reqwest::Client;

use crate::error::{PipelineError, Result};

/// HTTP client shared by the synthesis and storage clients
///
/// Per-call deadlines are applied by the pipeline, this client only bounds
/// connection setup.
pub fn http_client(connect_timeout: Duration) -> Result<Client> {
    let mut headers = http::HeaderMap::new();
    headers.insert(http::header::CONNECTION, http::HeaderValue::from_static("keep-alive"));

    Client::builder()
        .connect_timeout(connect_timeout)
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
        .build()
        .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))
}
