pub mod bytescale;

use std::path::Path;

use async_trait::async_trait;

use crate::{audio::UploadResult, error::Result};

/// Remote storage for finished audio files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under `file_name` and return where it can be fetched
    async fn upload(&self, local_path: &Path, file_name: &str, content_type: &str) -> Result<UploadResult>;

    /// Get the backend name
    fn name(&self) -> &str;
}
