use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    audio::UploadResult,
    error::{PipelineError, Result},
};

use super::ObjectStore;

const DEFAULT_BYTESCALE_API_URL: &str = "https://api.bytescale.com";

/// Bytescale binary upload client
pub struct BytescaleStore {
    client: Client,
    upload_url: String,
    api_key: SecretString,
    folder_path: Option<String>,
}

impl BytescaleStore {
    pub fn new(client: Client, config: &duet_config::StorageConfig) -> Self {
        let base_url = config
            .base_url
            .as_ref()
            .map_or(DEFAULT_BYTESCALE_API_URL, url::Url::as_str)
            .trim_end_matches('/');

        Self {
            client,
            upload_url: format!("{base_url}/v2/accounts/{}/uploads/binary", config.account_id),
            api_key: config.api_key.clone(),
            folder_path: config.folder_path.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BytescaleResponse {
    file_url: String,
    #[serde(default)]
    file_path: Option<String>,
}

#[async_trait]
impl ObjectStore for BytescaleStore {
    async fn upload(&self, local_path: &Path, file_name: &str, content_type: &str) -> Result<UploadResult> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| PipelineError::io(format_args!("failed to read {}", local_path.display()), &e))?;

        tracing::debug!(file_name, bytes = data.len(), "Bytescale upload");

        let mut query = vec![("fileName", file_name)];
        if let Some(folder) = self.folder_path.as_deref() {
            query.push(("folderPath", folder));
        }

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(self.api_key.expose_secret())
            .header(http::header::CONTENT_TYPE, content_type)
            .query(&query)
            .body(data)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Bytescale request failed: {e}");
                PipelineError::Connection {
                    service: "storage",
                    message: e.to_string(),
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            tracing::error!("Bytescale upload error ({status}): {body}");

            return Err(PipelineError::UploadFailed {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded: BytescaleResponse = response.json().await.map_err(|e| PipelineError::UploadFailed {
            status: status.as_u16(),
            body: format!("unexpected response body: {e}"),
        })?;

        tracing::debug!(file_url = %uploaded.file_url, "Bytescale upload complete");

        Ok(UploadResult {
            file_url: uploaded.file_url,
            file_path: uploaded.file_path,
        })
    }

    fn name(&self) -> &str {
        "bytescale"
    }
}
