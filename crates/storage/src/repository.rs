use async_trait::async_trait;
use progress_core::{PartialUpdate, ProgressDocument, ProgressError};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use crate::file::{DebouncedFileStore, FileProgressStore};
use crate::remote::{RemoteConfig, RemoteProgressStore};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("read error: {0}")]
    Read(String),

    #[error("corrupt document: {0}")]
    Corrupt(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("remote store responded with status {status}")]
    RemoteStatus { status: u16 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("item id `{item}` cannot be stored by this backend")]
    UnsupportedItemId { item: String },
}

impl From<ProgressError> for StorageError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::Corrupt(msg) => StorageError::Corrupt(msg),
            other => StorageError::Corrupt(other.to_string()),
        }
    }
}

/// Persistence contract for the single progress document.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Make sure a well-formed backing document exists.
    ///
    /// Creates an empty document when absent and resets a malformed one to
    /// empty. Safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only for unrecoverable I/O failures.
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Return the full current document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be read or parsed.
    async fn load(&self) -> Result<ProgressDocument, StorageError>;

    /// Shallow-union `update` into the stored document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the merged document cannot be persisted.
    async fn merge(&self, update: &PartialUpdate) -> Result<(), StorageError>;

    /// Push any staged updates to durable storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the staged batch cannot be written.
    async fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Short label used in logs.
    fn describe(&self) -> &'static str;
}

/// In-memory store for tests and throwaway runs.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    document: Arc<Mutex<ProgressDocument>>,
}

impl InMemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(document: ProgressDocument) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
        }
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn load(&self) -> Result<ProgressDocument, StorageError> {
        let guard = self
            .document
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn merge(&self, update: &PartialUpdate) -> Result<(), StorageError> {
        let mut guard = self
            .document
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.merge(update);
        Ok(())
    }

    fn describe(&self) -> &'static str {
        "memory"
    }
}

/// Which backend to open.
#[derive(Debug, Clone)]
pub enum Backend {
    Memory,
    File { path: PathBuf },
    DebouncedFile { path: PathBuf, window: Duration },
    Remote(RemoteConfig),
    Sqlite { url: String },
}

/// Default coalescing delay for the debounced file backend.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Holds the progress store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            progress: Arc::new(InMemoryProgressStore::new()),
        }
    }

    /// Open the configured backend. Does not initialize it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if a client or pool cannot be
    /// constructed.
    pub async fn open(backend: &Backend) -> Result<Self, StorageError> {
        let progress: Arc<dyn ProgressStore> = match backend {
            Backend::Memory => Arc::new(InMemoryProgressStore::new()),
            Backend::File { path } => Arc::new(FileProgressStore::new(path.clone())),
            Backend::DebouncedFile { path, window } => Arc::new(DebouncedFileStore::new(
                FileProgressStore::new(path.clone()),
                *window,
            )),
            Backend::Remote(config) => Arc::new(RemoteProgressStore::new(config.clone())?),
            Backend::Sqlite { url } => {
                return Self::sqlite(url)
                    .await
                    .map_err(|e| StorageError::Connection(e.to_string()));
            }
        };
        Ok(Self { progress })
    }
}
