use std::path::{Path, PathBuf};

use duet_config::StagingConfig;

use crate::{
    error::{PipelineError, Result},
    types::JobId,
};

/// Root of all job staging directories
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    keep_failed: bool,
}

impl StagingArea {
    pub fn new(config: &StagingConfig) -> Self {
        Self {
            root: config.directory.clone(),
            keep_failed: config.keep_failed,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the staging root if it does not exist yet
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PipelineError::io(format_args!("failed to create {}", self.root.display()), &e))
    }

    /// Create a fresh directory for one job
    ///
    /// The directory name carries a random suffix, so two jobs with the same
    /// id never share files.
    pub async fn acquire(&self, job_id: &JobId) -> Result<JobStaging> {
        let dir = self.root.join(format!("{job_id}-{}", uuid::Uuid::new_v4().simple()));

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipelineError::io(format_args!("failed to create {}", dir.display()), &e))?;

        Ok(JobStaging {
            dir,
            keep_failed: self.keep_failed,
            released: false,
        })
    }
}

/// Staging directory owned by one job
///
/// Removed by [`JobStaging::cleanup`]. If the guard is dropped without
/// cleanup (early return, panic, cancelled future) the directory is removed
/// on drop instead, on the blocking pool when inside a tokio runtime.
#[derive(Debug)]
pub struct JobStaging {
    dir: PathBuf,
    keep_failed: bool,
    released: bool,
}

impl JobStaging {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Unique raw and WAV paths for one line: `<seq>_<slug>_<suffix>.{raw,wav}`
    pub fn line_paths(&self, sequence: usize, slug: &str) -> (PathBuf, PathBuf) {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let stem = format!("{sequence}_{slug}_{}", &suffix[..8]);

        (
            self.dir.join(format!("{stem}.raw")),
            self.dir.join(format!("{stem}.wav")),
        )
    }

    /// Path of a file directly in the job directory
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Remove the job directory
    ///
    /// A failed job's directory is kept when `staging.keep_failed` is set.
    /// Removal errors are logged, never returned.
    pub async fn cleanup(mut self, succeeded: bool) {
        self.released = true;

        if !succeeded && self.keep_failed {
            tracing::info!(dir = %self.dir.display(), "Keeping staging directory of failed job");
            return;
        }

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => tracing::debug!(dir = %self.dir.display(), "Staging directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(dir = %self.dir.display(), "Failed to remove staging directory: {e}"),
        }
    }
}

impl Drop for JobStaging {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let dir = std::mem::take(&mut self.dir);

        // Off the async workers when a runtime is around
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_abandoned(&dir));
            }
            Err(_) => remove_abandoned(&dir),
        }
    }
}

fn remove_abandoned(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!(dir = %dir.display(), "Abandoned staging directory removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dir = %dir.display(), "Failed to remove staging directory: {e}"),
    }
}
