use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::SubmissionRecord;

pub const LOG_FILE_NAME: &str = "submissions.jsonl";

#[derive(Debug)]
pub enum StoreError {
    CreateDir(PathBuf, std::io::Error),
    Serialize(serde_json::Error),
    Write(PathBuf, std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::CreateDir(path, err) => {
                write!(f, "cannot create {}: {err}", path.display())
            }
            StoreError::Serialize(err) => write!(f, "cannot serialize record: {err}"),
            StoreError::Write(path, err) => write!(f, "cannot append to {}: {err}", path.display()),
        }
    }
}

impl std::error::Error for StoreError {}

/// Append-only newline-delimited JSON log of accepted submissions.
///
/// Cloning is cheap and every clone appends to the same file through the
/// same writer lock, so records from concurrent requests never interleave
/// within a line.
#[derive(Clone)]
pub struct SubmissionStore {
    dir: PathBuf,
    path: PathBuf,
    writer: Arc<Mutex<()>>,
}

impl SubmissionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(LOG_FILE_NAME);
        Self {
            dir,
            path,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line and sync it to disk.
    ///
    /// On failure the file is cut back to its previous length, so a reader
    /// never sees half a record.
    pub async fn append(&self, record: &SubmissionRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record).map_err(StoreError::Serialize)?;
        line.push(b'\n');

        let _guard = self.writer.lock().await;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::CreateDir(self.dir.clone(), e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::Write(self.path.clone(), e))?;

        let previous_len = file
            .metadata()
            .await
            .map_err(|e| StoreError::Write(self.path.clone(), e))?
            .len();

        // tokio buffers file writes; only flush reports a failed write.
        let written = async {
            file.write_all(&line).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;

        if let Err(e) = written {
            if let Err(rollback) = file.set_len(previous_len).await {
                tracing::error!(
                    "Failed to roll back partial record in {}: {rollback}",
                    self.path.display()
                );
            }
            return Err(StoreError::Write(self.path.clone(), e));
        }

        tracing::debug!("Appended {} bytes to {}", line.len(), self.path.display());
        Ok(())
    }
}
