//! Local JSON file backends.

mod debounced;

pub use debounced::DebouncedFileStore;

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use progress_core::{PartialUpdate, ProgressDocument};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::repository::{ProgressStore, StorageError};

/// Progress document kept in a single JSON file.
///
/// Every merge runs read, union and full write while holding an async lock,
/// so concurrent requests against the same instance never lose updates.
pub struct FileProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
    writes: AtomicU64,
}

impl FileProgressStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            writes: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of full-document writes this instance has completed.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("progress.json"), OsString::from);
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_document(&self) -> Result<ProgressDocument, StorageError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StorageError::Read(format!("{}: {e}", self.path.display())))?;
        Ok(ProgressDocument::from_json_str(&raw)?)
    }

    async fn write_document(&self, document: &ProgressDocument) -> Result<(), StorageError> {
        let text = document
            .to_json_pretty()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| StorageError::Write(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::Write(format!("{}: {e}", self.path.display())))?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn ensure_parent_dir(&self) -> Result<(), StorageError> {
        let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::Write(format!("{}: {e}", parent.display())))
    }
}

#[async_trait]
impl ProgressStore for FileProgressStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        self.ensure_parent_dir().await?;

        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match ProgressDocument::salvage_json_str(&raw) {
                Ok(salvaged) if salvaged.is_clean() => {
                    debug!(path = %self.path.display(), items = salvaged.document.len(), "progress file is valid");
                    Ok(())
                }
                Ok(salvaged) => {
                    warn!(
                        path = %self.path.display(),
                        dropped = ?salvaged.dropped,
                        kept = salvaged.document.len(),
                        "dropping progress entries that are not booleans"
                    );
                    self.write_document(&salvaged.document).await
                }
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "invalid JSON in progress file, resetting");
                    self.write_document(&ProgressDocument::new()).await
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "progress file not found, creating an empty one");
                self.write_document(&ProgressDocument::new()).await
            }
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), error = %err, "progress file is not UTF-8, resetting");
                self.write_document(&ProgressDocument::new()).await
            }
            Err(err) => Err(StorageError::Read(format!("{}: {err}", self.path.display()))),
        }
    }

    async fn load(&self) -> Result<ProgressDocument, StorageError> {
        self.read_document().await
    }

    async fn merge(&self, update: &PartialUpdate) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        if update.is_empty() {
            return Ok(());
        }
        document.merge(update);
        self.write_document(&document).await?;
        debug!(path = %self.path.display(), changed = update.len(), "progress written");
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "file"
    }
}
