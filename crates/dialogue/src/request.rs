use axum::{
    Json,
    body::Body,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::error::JobError;

/// Extractor for JSON request bodies
pub struct ExtractPayload<T>(pub T);

/// Body limit for audio requests (1 MiB)
const BODY_LIMIT_BYTES: usize = 1 << 20;

impl<S, T: DeserializeOwned> axum::extract::FromRequest<S> for ExtractPayload<T>
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: http::Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        if !is_json(&parts.headers) {
            return Err(reject(
                http::StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported Content-Type, expected: 'Content-Type: application/json'".to_owned(),
            ));
        }

        let bytes = axum::body::to_bytes(body, BODY_LIMIT_BYTES).await.map_err(|err| {
            if std::error::Error::source(&err).is_some_and(|source| source.is::<http_body_util::LengthLimitError>()) {
                reject(
                    http::StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Request body is too large, limit is {BODY_LIMIT_BYTES} bytes"),
                )
            } else {
                JobError::invalid_request(format!("Failed to read request body: {err}")).into_response()
            }
        })?;

        serde_json::from_slice::<T>(&bytes)
            .map(Self)
            .map_err(|e| JobError::invalid_request(format!("Failed to parse request body: {e}")).into_response())
    }
}

/// `application/json`, optionally with parameters such as a charset
fn is_json(headers: &http::HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn reject(status: http::StatusCode, details: String) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": "Invalid request",
            "kind": "invalid_request",
            "details": details,
        })),
    )
        .into_response()
}
